//! Organisms that namespaces and routed mappers can be scoped to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A species known to the router and the namespace registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Organism {
    ArabidopsisThaliana,
    BosTaurus,
    CaenorhabditisElegans,
    CanisFamiliaris,
    DanioRerio,
    DrosophilaMelanogaster,
    EscherichiaColi,
    GallusGallus,
    HomoSapiens,
    MusMusculus,
    MycobacteriumTuberculosis,
    OryzaSativa,
    PanTroglodytes,
    RattusNorvegicus,
    SaccharomycesCerevisiae,
    SusScrofa,
    XenopusTropicalis,
}

impl Organism {
    pub const ALL: [Organism; 17] = [
        Organism::ArabidopsisThaliana,
        Organism::BosTaurus,
        Organism::CaenorhabditisElegans,
        Organism::CanisFamiliaris,
        Organism::DanioRerio,
        Organism::DrosophilaMelanogaster,
        Organism::EscherichiaColi,
        Organism::GallusGallus,
        Organism::HomoSapiens,
        Organism::MusMusculus,
        Organism::MycobacteriumTuberculosis,
        Organism::OryzaSativa,
        Organism::PanTroglodytes,
        Organism::RattusNorvegicus,
        Organism::SaccharomycesCerevisiae,
        Organism::SusScrofa,
        Organism::XenopusTropicalis,
    ];

    /// Two-letter code used in gene database file names (`Hs_Derby_...`).
    pub fn code(self) -> &'static str {
        match self {
            Organism::ArabidopsisThaliana => "At",
            Organism::BosTaurus => "Bt",
            Organism::CaenorhabditisElegans => "Ce",
            Organism::CanisFamiliaris => "Cf",
            Organism::DanioRerio => "Dr",
            Organism::DrosophilaMelanogaster => "Dm",
            Organism::EscherichiaColi => "Ec",
            Organism::GallusGallus => "Gg",
            Organism::HomoSapiens => "Hs",
            Organism::MusMusculus => "Mm",
            Organism::MycobacteriumTuberculosis => "Mx",
            Organism::OryzaSativa => "Oj",
            Organism::PanTroglodytes => "Pt",
            Organism::RattusNorvegicus => "Rn",
            Organism::SaccharomycesCerevisiae => "Sc",
            Organism::SusScrofa => "Ss",
            Organism::XenopusTropicalis => "Xt",
        }
    }

    pub fn latin_name(self) -> &'static str {
        match self {
            Organism::ArabidopsisThaliana => "Arabidopsis thaliana",
            Organism::BosTaurus => "Bos taurus",
            Organism::CaenorhabditisElegans => "Caenorhabditis elegans",
            Organism::CanisFamiliaris => "Canis familiaris",
            Organism::DanioRerio => "Danio rerio",
            Organism::DrosophilaMelanogaster => "Drosophila melanogaster",
            Organism::EscherichiaColi => "Escherichia coli",
            Organism::GallusGallus => "Gallus gallus",
            Organism::HomoSapiens => "Homo sapiens",
            Organism::MusMusculus => "Mus musculus",
            Organism::MycobacteriumTuberculosis => "Mycobacterium tuberculosis",
            Organism::OryzaSativa => "Oryza sativa",
            Organism::PanTroglodytes => "Pan troglodytes",
            Organism::RattusNorvegicus => "Rattus norvegicus",
            Organism::SaccharomycesCerevisiae => "Saccharomyces cerevisiae",
            Organism::SusScrofa => "Sus scrofa",
            Organism::XenopusTropicalis => "Xenopus tropicalis",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Organism::ArabidopsisThaliana => "Arabidopsis",
            Organism::BosTaurus => "Cow",
            Organism::CaenorhabditisElegans => "Worm",
            Organism::CanisFamiliaris => "Dog",
            Organism::DanioRerio => "Zebra fish",
            Organism::DrosophilaMelanogaster => "Fruit fly",
            Organism::EscherichiaColi => "E. coli",
            Organism::GallusGallus => "Chicken",
            Organism::HomoSapiens => "Human",
            Organism::MusMusculus => "Mouse",
            Organism::MycobacteriumTuberculosis => "Tuberculosis",
            Organism::OryzaSativa => "Rice",
            Organism::PanTroglodytes => "Chimpanzee",
            Organism::RattusNorvegicus => "Rat",
            Organism::SaccharomycesCerevisiae => "Yeast",
            Organism::SusScrofa => "Pig",
            Organism::XenopusTropicalis => "Frog",
        }
    }

    pub fn from_latin_name(name: &str) -> Option<Organism> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|org| org.latin_name().eq_ignore_ascii_case(name))
    }

    pub fn from_english_name(name: &str) -> Option<Organism> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|org| org.english_name().eq_ignore_ascii_case(name))
    }

    pub fn from_code(code: &str) -> Option<Organism> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|org| org.code().eq_ignore_ascii_case(code))
    }

    /// Resolve a latin name, English name or two-letter code.
    pub fn lookup(token: &str) -> Option<Organism> {
        Self::from_latin_name(token)
            .or_else(|| Self::from_english_name(token))
            .or_else(|| Self::from_code(token))
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.latin_name())
    }
}

impl FromStr for Organism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Organism::lookup(s).ok_or_else(|| format!("unknown organism: {s}"))
    }
}
