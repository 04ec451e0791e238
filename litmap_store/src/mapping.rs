use serde_json::{json, Value};

use crate::EMBEDDING_DIM;

/// The custom analyzer every text field in the article/chunk indices uses:
/// standard tokenizer, lowercase, and a word-delimiter filter configured to
/// preserve the original token alongside the split ones (spec §6).
fn custom_analyzer_settings() -> Value {
    json!({
        "analysis": {
            "analyzer": {
                "custom_text_analyzer": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "word_delimiter_preserve_original"]
                }
            },
            "filter": {
                "word_delimiter_preserve_original": {
                    "type": "word_delimiter_graph",
                    "preserve_original": true
                }
            }
        }
    })
}

fn knn_vector_field(dim: usize) -> Value {
    json!({
        "type": "knn_vector",
        "dimension": dim,
        "method": {
            "name": "hnsw",
            "engine": "lucene",
            "space_type": "cosinesimil",
            "parameters": {
                "ef_construction": 40,
                "m": 8
            }
        }
    })
}

fn text_field() -> Value {
    json!({ "type": "text", "analyzer": "custom_text_analyzer" })
}

fn date_field() -> Value {
    json!({ "type": "date", "format": "yyyy-MM-dd", "null_value": "1900-01-01" })
}

/// Index settings + mapping for the source article index (spec §6): text
/// fields use the custom analyzer; dates are `yyyy-MM-dd` with a
/// `1900-01-01` null value; authors/affiliations, grants, chemicals,
/// keywords, mesh terms, publication types, and journal info are nested
/// objects.
pub fn article_index_body() -> Value {
    json!({
        "settings": custom_analyzer_settings(),
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": text_field(),
                "vernacularTitle": text_field(),
                "abstract": text_field(),
                "otherAbstract": text_field(),
                "language": { "type": "keyword" },
                "status": { "type": "keyword" },
                "articleDate": date_field(),
                "history": {
                    "type": "nested",
                    "properties": {
                        "date": date_field(),
                        "type": { "type": "keyword" }
                    }
                },
                "authors": {
                    "type": "nested",
                    "properties": {
                        "firstName": { "type": "keyword" },
                        "lastName": { "type": "keyword" },
                        "affiliations": {
                            "type": "nested",
                            "properties": { "text": text_field() }
                        }
                    }
                },
                "grants": {
                    "type": "nested",
                    "properties": {
                        "grantId": { "type": "keyword" },
                        "agency": { "type": "keyword" },
                        "country": { "type": "keyword" }
                    }
                },
                "chemicals": {
                    "type": "nested",
                    "properties": {
                        "registryNumber": { "type": "keyword" },
                        "nameOfSubstance": text_field()
                    }
                },
                "keywords": {
                    "type": "nested",
                    "properties": {
                        "name": text_field(),
                        "major": { "type": "boolean" }
                    }
                },
                "meshTerms": {
                    "type": "nested",
                    "properties": {
                        "id": { "type": "keyword" },
                        "name": text_field(),
                        "major": { "type": "boolean" }
                    }
                },
                "publicationTypes": {
                    "type": "nested",
                    "properties": { "name": { "type": "keyword" } }
                },
                "journal": {
                    "type": "object",
                    "properties": {
                        "title": text_field(),
                        "abbreviation": { "type": "keyword" },
                        "issue": {
                            "type": "object",
                            "properties": {
                                "medium": { "type": "keyword" },
                                "volume": { "type": "keyword" },
                                "number": { "type": "keyword" },
                                "year": { "type": "integer" },
                                "month": { "type": "integer" },
                                "day": { "type": "integer" }
                            }
                        }
                    }
                },
                "fullTextUrl": { "type": "keyword" },
                "vectorised": { "type": "boolean" },
                "nlpProcessed": { "type": "boolean" },
                "fullText": text_field()
            }
        }
    })
}

/// Index settings + mapping for a chunk index (spec §6: KNN enabled,
/// `pubmed_bert_vector` is `knn_vector` dim=768 hnsw/lucene/cosine,
/// `ef_construction=40, m=8`; other fields are text with the custom
/// analyzer; `articleDate` is a date field). Both the `complete` and
/// `sentence` chunking strategies share this mapping.
pub fn chunk_index_body() -> Value {
    let mut settings = custom_analyzer_settings();
    settings["index"] = json!({ "knn": true });

    json!({
        "settings": settings,
        "mappings": {
            "properties": {
                "articleId": { "type": "keyword" },
                "chunkIndex": { "type": "integer" },
                "text": text_field(),
                "pubmed_bert_vector": knn_vector_field(EMBEDDING_DIM),
                "articleDate": date_field(),
                "title": text_field(),
                "journalTitle": text_field(),
                "meshNames": text_field(),
                "meshIds": { "type": "keyword" },
                "chemicals": text_field(),
                "keywords": text_field(),
                "authorNames": text_field(),
                "authorAffiliations": text_field(),
                "sourceIndex": { "type": "keyword" }
            }
        }
    })
}

/// Index settings + mapping for the cluster index (spec §6): KNN enabled,
/// `cluster_embedding` knn_vector dim=768 with the same engine/parameters;
/// `path` is a keyword (store-side, must stay ≤32,766 bytes); `children`
/// is a keyword array; `depth` integer; `pairwise_similarity` and
/// `topic_information` are objects; `is_leaf` boolean; `x`,`y` float.
pub fn cluster_index_body() -> Value {
    json!({
        "settings": { "index": { "knn": true } },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "label": { "type": "keyword" },
                "description": { "type": "text" },
                "cluster_embedding": knn_vector_field(EMBEDDING_DIM),
                "path": { "type": "keyword" },
                "children": { "type": "keyword" },
                "depth": { "type": "integer" },
                "pairwise_similarity": { "type": "object", "enabled": true },
                "topic_information": { "type": "object", "enabled": true },
                "is_leaf": { "type": "boolean" },
                "size": { "type": "integer" },
                "x": { "type": "float" },
                "y": { "type": "float" }
            }
        }
    })
}

/// Index settings + mapping for the document-projection index (spec §6):
/// same KNN vector parameters as the cluster index; `document_id` is a
/// keyword; `date` a date; `cluster_id` a keyword; `x`,`y` float.
pub fn document_projection_index_body() -> Value {
    json!({
        "settings": { "index": { "knn": true } },
        "mappings": {
            "properties": {
                "document_id": { "type": "keyword" },
                "title": { "type": "text" },
                "abstract": { "type": "text" },
                "date": date_field(),
                "authors": { "type": "keyword" },
                "keywords": { "type": "keyword" },
                "mesh": { "type": "keyword" },
                "chemicals": { "type": "keyword" },
                "journalTitle": { "type": "keyword" },
                "cluster_id": { "type": "keyword" },
                "x": { "type": "float" },
                "y": { "type": "float" },
                "pubmed_bert_vector": knn_vector_field(EMBEDDING_DIM)
            }
        }
    })
}
