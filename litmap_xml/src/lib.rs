//! XML → [`litmap_types::Article`] (spec C4, §4.4). Tolerates missing
//! optional children and mixed content in titles/abstracts; elements other
//! than `PubmedArticle` (e.g. book articles) are skipped with a debug log.

mod date;
mod parser;
mod tree;

pub use date::repair_article_date;
pub use parser::{parse_articles, XmlError};
