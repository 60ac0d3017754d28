use serde::{
    Deserialize,
    Serialize,
};

pub const ELECTRON_MASS: f64 = 0.000_548_579_909_065;

/// Stable isotope of an element: exact mass and natural abundance (fraction).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Isotope {
    pub mass: f64,
    pub abundance: f64,
}

const fn iso(mass: f64, abundance: f64) -> Isotope {
    Isotope { mass, abundance }
}

// Masses from the AME2020 evaluation, abundances IUPAC representative values.
const H: &[Isotope] = &[iso(1.007_825_032_23, 0.999_885), iso(2.014_101_778_12, 0.000_115)];
const LI: &[Isotope] = &[iso(6.015_122_887_4, 0.0759), iso(7.016_003_436_6, 0.9241)];
const B: &[Isotope] = &[iso(10.012_936_95, 0.199), iso(11.009_305_36, 0.801)];
const C: &[Isotope] = &[iso(12.0, 0.9893), iso(13.003_354_835_07, 0.0107)];
const N: &[Isotope] = &[iso(14.003_074_004_43, 0.996_36), iso(15.000_108_898_88, 0.003_64)];
const O: &[Isotope] = &[
    iso(15.994_914_619_57, 0.997_57),
    iso(16.999_131_756_50, 0.000_38),
    iso(17.999_159_612_86, 0.002_05),
];
const F: &[Isotope] = &[iso(18.998_403_162_73, 1.0)];
const NA: &[Isotope] = &[iso(22.989_769_282_0, 1.0)];
const MG: &[Isotope] = &[
    iso(23.985_041_697, 0.7899),
    iso(24.985_836_976, 0.1000),
    iso(25.982_592_968, 0.1101),
];
const SI: &[Isotope] = &[
    iso(27.976_926_534_65, 0.922_23),
    iso(28.976_494_664_90, 0.046_85),
    iso(29.973_770_136, 0.030_92),
];
const P: &[Isotope] = &[iso(30.973_761_998_42, 1.0)];
const S: &[Isotope] = &[
    iso(31.972_071_174_4, 0.9499),
    iso(32.971_458_909_8, 0.0075),
    iso(33.967_867_004, 0.0425),
    iso(35.967_080_71, 0.0001),
];
const CL: &[Isotope] = &[iso(34.968_852_682, 0.7576), iso(36.965_902_602, 0.2424)];
const K: &[Isotope] = &[
    iso(38.963_706_486_4, 0.932_581),
    iso(39.963_998_166, 0.000_117),
    iso(40.961_825_257_9, 0.067_302),
];
const CA: &[Isotope] = &[
    iso(39.962_590_863, 0.969_41),
    iso(41.958_617_83, 0.006_47),
    iso(42.958_766_44, 0.001_35),
    iso(43.955_481_56, 0.020_86),
    iso(45.953_689_0, 0.000_04),
    iso(47.952_522_76, 0.001_87),
];
const FE: &[Isotope] = &[
    iso(53.939_608_99, 0.058_45),
    iso(55.934_936_33, 0.917_54),
    iso(56.935_392_84, 0.021_19),
    iso(57.933_274_43, 0.002_82),
];
const CU: &[Isotope] = &[iso(62.929_597_72, 0.6915), iso(64.927_789_70, 0.3085)];
const ZN: &[Isotope] = &[
    iso(63.929_142_01, 0.4917),
    iso(65.926_033_81, 0.2773),
    iso(66.927_127_75, 0.0404),
    iso(67.924_844_55, 0.1845),
    iso(69.925_319_2, 0.0061),
];
const SE: &[Isotope] = &[
    iso(73.922_475_934, 0.0089),
    iso(75.919_213_704, 0.0937),
    iso(76.919_914_154, 0.0763),
    iso(77.917_309_28, 0.2377),
    iso(79.916_521_8, 0.4961),
    iso(81.916_699_5, 0.0873),
];
const BR: &[Isotope] = &[iso(78.918_337_6, 0.5069), iso(80.916_289_7, 0.4931)];
const I: &[Isotope] = &[iso(126.904_471_9, 1.0)];

/// Elements supported in formulas.
///
/// Declaration order is only used for `Ord`, formulas are printed in Hill order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    H,
    Li,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Fe,
    Cu,
    Zn,
    Se,
    Br,
    I,
}

impl Element {
    pub const ALL: [Element; 21] = [
        Element::H,
        Element::Li,
        Element::B,
        Element::C,
        Element::N,
        Element::O,
        Element::F,
        Element::Na,
        Element::Mg,
        Element::Si,
        Element::P,
        Element::S,
        Element::Cl,
        Element::K,
        Element::Ca,
        Element::Fe,
        Element::Cu,
        Element::Zn,
        Element::Se,
        Element::Br,
        Element::I,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::Li => "Li",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Fe => "Fe",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Element> {
        Element::ALL.into_iter().find(|e| e.symbol() == symbol)
    }

    pub fn isotopes(&self) -> &'static [Isotope] {
        match self {
            Element::H => H,
            Element::Li => LI,
            Element::B => B,
            Element::C => C,
            Element::N => N,
            Element::O => O,
            Element::F => F,
            Element::Na => NA,
            Element::Mg => MG,
            Element::Si => SI,
            Element::P => P,
            Element::S => S,
            Element::Cl => CL,
            Element::K => K,
            Element::Ca => CA,
            Element::Fe => FE,
            Element::Cu => CU,
            Element::Zn => ZN,
            Element::Se => SE,
            Element::Br => BR,
            Element::I => I,
        }
    }

    /// Mass of the most abundant isotope.
    pub fn monoisotopic_mass(&self) -> f64 {
        self.isotopes()
            .iter()
            .fold((0.0, f64::NEG_INFINITY), |acc, x| {
                if x.abundance > acc.1 {
                    (x.mass, x.abundance)
                } else {
                    acc
                }
            })
            .0
    }
}
