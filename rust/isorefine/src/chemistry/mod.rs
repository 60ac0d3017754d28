pub mod elements;
pub mod formula;
pub mod ion_type;

pub use elements::{
    ELECTRON_MASS,
    Element,
    Isotope,
};
pub use formula::MolecularFormula;
pub use ion_type::{
    IonType,
    Polarity,
};
