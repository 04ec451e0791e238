use litmap_types::{
    Affiliation, Article, Author, Chemical, Grant, HistoryEntry, HistoryType, Issue, JournalInfo,
    Keyword, MeshTerm, PublicationType,
};
use observability_deps::tracing::debug;
use thiserror::Error;

use crate::date::{repair_article_date, DateCandidate, HistoryCandidate};
use crate::tree::{parse_top_level_children, Node};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    /// Parse failure for a single article is fatal for the whole batch
    /// (spec §4.4: "the id is reported and the stage exits non-zero").
    #[error("failed to parse article {id}: {reason}")]
    Article { id: String, reason: String },
}

/// Parses one batch of `<PubmedArticle>` elements. Elements tagged
/// anything else (e.g. `PubmedBookArticle`) are skipped with a debug log
/// rather than treated as an error (spec §4.4).
pub fn parse_articles(xml: &str) -> Result<Vec<Article>, XmlError> {
    let top_level = parse_top_level_children(xml)?;
    let mut articles = Vec::with_capacity(top_level.len());

    for node in top_level {
        if node.tag != "PubmedArticle" {
            debug!(tag = %node.tag, "skipping non-PubmedArticle element");
            continue;
        }
        articles.push(parse_one(&node)?);
    }

    Ok(articles)
}

fn parse_one(node: &Node) -> Result<Article, XmlError> {
    let citation = node.child("MedlineCitation").ok_or_else(|| XmlError::Article {
        id: "<unknown>".to_string(),
        reason: "missing MedlineCitation".to_string(),
    })?;

    let id = citation
        .child_flat_text("PMID")
        .ok_or_else(|| XmlError::Article {
            id: "<unknown>".to_string(),
            reason: "missing PMID".to_string(),
        })?;

    let article = citation.child("Article").ok_or_else(|| XmlError::Article {
        id: id.clone(),
        reason: "missing Article".to_string(),
    })?;

    let title = article
        .child_flat_text("ArticleTitle")
        .unwrap_or_else(|| "NONE".to_string());
    let vernacular_title = article.child_flat_text("VernacularTitle");
    let language = article.child_flat_text("Language");
    let status = citation.attr("Status").map(str::to_string);

    let (abstract_text, other_abstract) = parse_abstract(article);
    let journal = parse_journal(article);
    let authors = parse_authors(article);
    let grants = parse_grants(article);
    let publication_types = parse_publication_types(article);
    let mesh_terms = parse_mesh_terms(citation);
    let chemicals = parse_chemicals(citation);
    let keywords = parse_keywords(citation);
    let history = parse_history(node);
    let full_text_url = parse_full_text_url(node);

    let article_date_candidate = article.child("ArticleDate").and_then(parse_date_candidate);
    let pub_date_candidate = journal_pub_date_candidate(article);
    let article_date = repair_article_date(
        &id,
        article_date_candidate,
        pub_date_candidate,
        &history_candidates(&history),
    );

    Ok(Article {
        id,
        title,
        vernacular_title,
        abstract_text,
        other_abstract,
        language,
        status,
        article_date,
        history,
        authors,
        grants,
        chemicals,
        keywords,
        mesh_terms,
        publication_types,
        journal,
        full_text_url,
        vectorised: false,
        nlp_processed: false,
        full_text: None,
    })
}

fn parse_abstract(article: &Node) -> (Option<String>, Option<String>) {
    let Some(abstract_node) = article.child("Abstract") else {
        return (None, None);
    };

    let mut main = None;
    let mut other = None;
    for text_node in abstract_node.children("AbstractText") {
        let flattened = text_node.flatten_text();
        if text_node.attr("Label").is_some() || text_node.attr("NlmCategory").is_some() {
            other = Some(match other {
                Some(existing) => format!("{existing} {flattened}"),
                None => flattened,
            });
        } else {
            main = Some(match main {
                Some(existing) => format!("{existing} {flattened}"),
                None => flattened,
            });
        }
    }
    (main, other)
}

fn parse_journal(article: &Node) -> JournalInfo {
    let Some(journal_node) = article.child("Journal") else {
        return JournalInfo {
            title: None,
            abbreviation: None,
            issue: empty_issue(),
        };
    };

    let title = journal_node.child_flat_text("Title");
    let abbreviation = journal_node.child_flat_text("ISOAbbreviation");
    let issue = journal_node
        .child("JournalIssue")
        .map(parse_issue)
        .unwrap_or_else(empty_issue);

    JournalInfo {
        title,
        abbreviation,
        issue,
    }
}

fn parse_issue(journal_issue: &Node) -> Issue {
    let medium = journal_issue.attr("CitedMedium").map(str::to_string);
    let volume = journal_issue.child_flat_text("Volume");
    let number = journal_issue.child_flat_text("Issue");
    let (year, month, day) = journal_issue
        .child("PubDate")
        .map(parse_year_month_day)
        .unwrap_or((None, None, None));

    Issue {
        medium,
        volume,
        number,
        year,
        month,
        day,
    }
}

fn empty_issue() -> Issue {
    Issue {
        medium: None,
        volume: None,
        number: None,
        year: None,
        month: None,
        day: None,
    }
}

fn journal_pub_date_candidate(article: &Node) -> Option<DateCandidate> {
    let pub_date = article.child("Journal")?.child("JournalIssue")?.child("PubDate")?;
    parse_date_candidate(pub_date)
}

fn parse_year_month_day(node: &Node) -> (Option<i32>, Option<u32>, Option<u32>) {
    let year = node.child_flat_text("Year").and_then(|s| s.parse().ok());
    let month = node
        .child_flat_text("Month")
        .and_then(|s| parse_month(&s));
    let day = node.child_flat_text("Day").and_then(|s| s.parse().ok());
    (year, month, day)
}

fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let lower = raw.to_lowercase();
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|idx| idx as u32 + 1)
}

fn parse_date_candidate(node: &Node) -> Option<DateCandidate> {
    let (year, month, day) = parse_year_month_day(node);
    Some(DateCandidate {
        year: year?,
        month: month.unwrap_or(1),
        day: day.unwrap_or(1),
    })
}

fn parse_authors(article: &Node) -> Vec<Author> {
    let Some(list) = article.child("AuthorList") else {
        return Vec::new();
    };
    list.children("Author")
        .map(|author| {
            let affiliations = author
                .children("AffiliationInfo")
                .filter_map(|a| a.child_flat_text("Affiliation"))
                .map(|text| Affiliation { text })
                .collect();
            Author {
                first_name: author.child_flat_text("ForeName"),
                last_name: author.child_flat_text("LastName"),
                affiliations,
            }
        })
        .collect()
}

fn parse_grants(article: &Node) -> Vec<Grant> {
    let Some(list) = article.child("GrantList") else {
        return Vec::new();
    };
    list.children("Grant")
        .map(|grant| Grant {
            grant_id: grant.child_flat_text("GrantID"),
            agency: grant.child_flat_text("Agency"),
            country: grant.child_flat_text("Country"),
        })
        .collect()
}

fn parse_publication_types(article: &Node) -> Vec<PublicationType> {
    let Some(list) = article.child("PublicationTypeList") else {
        return Vec::new();
    };
    list.children("PublicationType")
        .map(|node| PublicationType {
            name: node.flatten_text(),
        })
        .collect()
}

fn parse_mesh_terms(citation: &Node) -> Vec<MeshTerm> {
    let Some(list) = citation.child("MeshHeadingList") else {
        return Vec::new();
    };
    list.children("MeshHeading")
        .filter_map(|heading| {
            let descriptor = heading.child("DescriptorName")?;
            Some(MeshTerm {
                id: descriptor.attr("UI").map(str::to_string),
                name: descriptor.flatten_text(),
                major: descriptor.attr("MajorTopicYN") == Some("Y"),
            })
        })
        .collect()
}

fn parse_chemicals(citation: &Node) -> Vec<Chemical> {
    let Some(list) = citation.child("ChemicalList") else {
        return Vec::new();
    };
    list.children("Chemical")
        .map(|chemical| Chemical {
            registry_number: chemical.child_flat_text("RegistryNumber"),
            name_of_substance: chemical
                .child_flat_text("NameOfSubstance")
                .unwrap_or_else(|| "NONE".to_string()),
        })
        .collect()
}

fn parse_keywords(citation: &Node) -> Vec<Keyword> {
    let Some(list) = citation.child("KeywordList") else {
        return Vec::new();
    };
    list.children("Keyword")
        .map(|keyword| Keyword {
            name: keyword.flatten_text(),
            major: keyword.attr("MajorTopicYN") == Some("Y"),
        })
        .collect()
}

fn parse_history(node: &Node) -> Vec<HistoryEntry> {
    let Some(history) = node.child("PubmedData").and_then(|d| d.child("History")) else {
        return Vec::new();
    };
    history
        .children("PubMedPubDate")
        .filter_map(|entry| {
            let (year, month, day) = parse_year_month_day(entry);
            let date = chrono::NaiveDate::from_ymd_opt(year?, month.unwrap_or(1), day.unwrap_or(1))?;
            let kind = history_type(entry.attr("PubStatus").unwrap_or("other"));
            Some(HistoryEntry { date, kind })
        })
        .collect()
}

fn history_candidates(history: &[HistoryEntry]) -> Vec<HistoryCandidate> {
    history
        .iter()
        .map(|entry| HistoryCandidate {
            kind: format!("{:?}", entry.kind).to_lowercase(),
            date: DateCandidate {
                year: entry.date.format("%Y").to_string().parse().unwrap_or(1900),
                month: entry.date.format("%m").to_string().parse().unwrap_or(1),
                day: entry.date.format("%d").to_string().parse().unwrap_or(1),
            },
        })
        .collect()
}

fn history_type(raw: &str) -> HistoryType {
    match raw.to_lowercase().as_str() {
        "received" => HistoryType::Received,
        "accepted" => HistoryType::Accepted,
        "revised" => HistoryType::Revised,
        "entrez" => HistoryType::Entrez,
        "pubmed" => HistoryType::PubMed,
        "medline" => HistoryType::Medline,
        _ => HistoryType::Other,
    }
}

fn parse_full_text_url(node: &Node) -> Option<String> {
    let ids = node.child("PubmedData")?.child("ArticleIdList")?;
    ids.children("ArticleId")
        .find(|id| id.attr("IdType") == Some("doi"))
        .map(|id| format!("https://doi.org/{}", id.flatten_text()))
}
