use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A placeholder used in place of an implicit null for optional text
/// fields (SPEC_FULL.md §9 "Dynamic XML shapes" — nullable fields get an
/// explicit placeholder so the store mapping stays null-value-friendly).
pub const NONE_PLACEHOLDER: &str = "NONE";

/// One record from the external article service, keyed by external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// External id; unique per store (spec §3 invariant).
    pub id: String,
    pub title: String,
    pub vernacular_title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub other_abstract: Option<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    /// Non-null; derived per the date-repair rule in spec §3 when the XML
    /// omits it.
    pub article_date: NaiveDate,
    pub history: Vec<HistoryEntry>,
    pub authors: Vec<Author>,
    pub grants: Vec<Grant>,
    pub chemicals: Vec<Chemical>,
    pub keywords: Vec<Keyword>,
    pub mesh_terms: Vec<MeshTerm>,
    pub publication_types: Vec<PublicationType>,
    pub journal: JournalInfo,
    pub full_text_url: Option<String>,
    pub vectorised: bool,
    pub nlp_processed: bool,
    pub full_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryType {
    Received,
    Accepted,
    Revised,
    Entrez,
    PubMed,
    Medline,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HistoryType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub affiliations: Vec<Affiliation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub grant_id: Option<String>,
    pub agency: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chemical {
    pub registry_number: Option<String>,
    pub name_of_substance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub name: String,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshTerm {
    pub id: Option<String>,
    pub name: String,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationType {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub medium: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalInfo {
    pub title: Option<String>,
    pub abbreviation: Option<String>,
    pub issue: Issue,
}

impl Article {
    /// The title of the mesh terms flagged `major`, used when denormalizing
    /// chunk metadata in Stage E.
    pub fn major_mesh_names(&self) -> Vec<&str> {
        self.mesh_terms
            .iter()
            .filter(|m| m.major)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Whether the abstract is present and not one of the two placeholder
    /// strings Stage E filters on (spec §4.6).
    pub fn has_usable_abstract(&self) -> bool {
        match &self.abstract_text {
            None => false,
            Some(text) => {
                let lower = text.to_lowercase();
                !lower.contains("no abstract available on pubmed")
                    && !text.contains("ABSTRACT TRUNCATED AT")
            }
        }
    }
}
