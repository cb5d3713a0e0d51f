//! TF-IDF vectors and cosine similarity over a small in-memory corpus.
//!
//! Tokens are runs of two or more word characters (letters, digits,
//! underscore), lower-cased, with English stop words removed. Weights are
//! raw term counts times smoothed idf, `ln((1 + n) / (1 + df)) + 1`, and
//! every document vector is L2-normalized, so a dot product is the cosine.

use std::collections::HashMap;

use super::stop_words::is_stop_word;

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

/// Sparse, L2-normalized document vector keyed by vocabulary index.
type SparseVector = HashMap<usize, f64>;

fn vectorize(corpus: &[Vec<String>]) -> Option<Vec<SparseVector>> {
    let mut vocabulary: HashMap<&str, usize> = HashMap::new();
    let mut document_frequency: Vec<usize> = Vec::new();

    for tokens in corpus {
        let mut seen: Vec<usize> = Vec::new();
        for token in tokens {
            let next = vocabulary.len();
            let index = *vocabulary.entry(token.as_str()).or_insert(next);
            if index == document_frequency.len() {
                document_frequency.push(0);
            }
            if !seen.contains(&index) {
                seen.push(index);
                document_frequency[index] += 1;
            }
        }
    }

    if vocabulary.is_empty() {
        return None;
    }

    let n = corpus.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    let vectors = corpus
        .iter()
        .map(|tokens| {
            let mut vector = SparseVector::new();
            for token in tokens {
                let index = vocabulary[token.as_str()];
                *vector.entry(index).or_insert(0.0) += idf[index];
            }

            let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for weight in vector.values_mut() {
                    *weight /= norm;
                }
            }
            vector
        })
        .collect();

    Some(vectors)
}

fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(index, w)| large.get(index).map(|v| w * v))
        .sum()
}

/// Cosine similarity of `query` against each document, in document order.
///
/// Returns `None` when the corpus has no usable token at all.
pub fn similarity_to_query(query: &str, documents: &[String]) -> Option<Vec<f64>> {
    let corpus: Vec<Vec<String>> = std::iter::once(query)
        .chain(documents.iter().map(String::as_str))
        .map(tokenize)
        .collect();

    let vectors = vectorize(&corpus)?;
    let (query_vector, rest) = vectors.split_first()?;

    Some(
        rest.iter()
            .map(|doc| dot(query_vector, doc).clamp(0.0, 1.0))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_drops_short_tokens_and_stop_words() {
        assert_eq!(
            tokenize("Build a React + Django app, with CI/CD x 2"),
            vec!["build", "react", "django", "app", "ci", "cd"]
        );
        assert_eq!(tokenize("snake_case stays"), vec!["snake_case", "stays"]);
    }

    #[test]
    fn identical_documents_score_one() {
        let scores = similarity_to_query("rust backend", &["rust backend".into()]).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_documents_score_zero() {
        let scores =
            similarity_to_query("logo design", &["python scripting".into(), String::new()]).unwrap();
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn rarer_shared_terms_weigh_more() {
        let docs = vec![
            "react developer".to_string(),
            "django developer".to_string(),
            "react django developer".to_string(),
        ];
        let scores = similarity_to_query("react django", &docs).unwrap();
        assert!(scores[2] > scores[0]);
        assert!(scores[2] > scores[1]);
    }

    #[test]
    fn empty_vocabulary_is_reported() {
        assert!(similarity_to_query("the and of", &["a an".into()]).is_none());
        assert!(similarity_to_query("", &[]).is_none());
    }
}
