//! Result fusion — merge per-collection result sets into one globally
//! distance-ranked view.

use serde_json::Value;
use thiserror::Error;

use super::types::CollectionHits;

#[derive(Debug, Error)]
#[error("fused sequences differ in length: {documents} documents, {metadatas} metadatas, {distances} distances")]
pub struct FusedLengthMismatch {
    pub documents: usize,
    pub metadatas: usize,
    pub distances: usize,
}

/// Globally merged retrieval view: three parallel sequences of equal
/// length, sorted ascending by distance across every input collection.
///
/// Read-only once produced; index `i` of each sequence belongs together.
#[derive(Debug, Clone, Default)]
pub struct FusedResults {
    documents: Vec<String>,
    metadatas: Vec<Value>,
    distances: Vec<f32>,
}

impl FusedResults {
    /// Build from pre-aligned sequences, validating the length invariant.
    pub fn from_parts(
        documents: Vec<String>,
        metadatas: Vec<Value>,
        distances: Vec<f32>,
    ) -> Result<Self, FusedLengthMismatch> {
        if documents.len() != metadatas.len() || documents.len() != distances.len() {
            return Err(FusedLengthMismatch {
                documents: documents.len(),
                metadatas: metadatas.len(),
                distances: distances.len(),
            });
        }
        Ok(Self {
            documents,
            metadatas,
            distances,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadatas(&self) -> &[Value] {
        &self.metadatas
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Iterate aligned (document, metadata, distance) triples.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value, f32)> {
        self.documents
            .iter()
            .zip(self.metadatas.iter())
            .zip(self.distances.iter())
            .map(|((doc, meta), dist)| (doc, meta, *dist))
    }
}

/// Flatten every collection's hits into one combined set and sort it
/// ascending by distance.
///
/// The sort is stable: entries with equal distance keep their relative
/// input order, so the caller's collection ordering is the tie-break.
/// Collections with no hits are skipped; an empty input fuses to an empty
/// result, not an error.
pub fn fuse<'a, I>(results: I) -> FusedResults
where
    I: IntoIterator<Item = &'a CollectionHits>,
{
    let mut combined: Vec<(String, Value, f32)> = Vec::new();

    for collection in results {
        if collection.hits.is_empty() {
            continue;
        }
        for hit in &collection.hits {
            combined.push((hit.document.clone(), hit.metadata.clone(), hit.distance));
        }
    }

    combined.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut fused = FusedResults::default();
    for (document, metadata, distance) in combined {
        fused.documents.push(document);
        fused.metadatas.push(metadata);
        fused.distances.push(distance);
    }
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SearchHit;
    use serde_json::json;

    fn hits(collection: &str, distances: &[f32]) -> CollectionHits {
        CollectionHits {
            collection: collection.to_string(),
            hits: distances
                .iter()
                .enumerate()
                .map(|(i, d)| SearchHit {
                    document: format!("{collection}-{i}"),
                    metadata: json!({"source": collection}),
                    distance: *d,
                })
                .collect(),
        }
    }

    #[test]
    fn distances_are_non_decreasing() {
        let a = hits("jazz_packages", &[0.7, 0.2, 0.9]);
        let b = hits("ocr_packages", &[0.4, 0.1]);
        let fused = fuse([&a, &b]);

        for pair in fused.distances().windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn equal_distances_keep_input_order() {
        let a = hits("first", &[0.5]);
        let b = hits("second", &[0.5]);
        let c = hits("third", &[0.5]);
        let fused = fuse([&a, &b, &c]);

        assert_eq!(fused.documents(), &["first-0", "second-0", "third-0"]);
    }

    #[test]
    fn output_length_is_sum_of_non_empty_inputs() {
        let a = hits("a", &[0.3, 0.1]);
        let empty = hits("empty", &[]);
        let b = hits("b", &[0.2]);
        let fused = fuse([&a, &empty, &b]);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused.documents().len(), fused.metadatas().len());
        assert_eq!(fused.documents().len(), fused.distances().len());
    }

    #[test]
    fn three_collections_merge_globally_sorted() {
        let a = hits("a", &[0.3, 0.1]);
        let b = hits("b", &[0.5, 0.2]);
        let c = hits("c", &[0.4]);
        let fused = fuse([&a, &b, &c]);

        assert_eq!(fused.distances(), &[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(fused.documents(), &["a-1", "b-1", "a-0", "c-0", "b-0"]);
    }

    #[test]
    fn metadata_stays_aligned_with_documents() {
        let a = hits("scraped", &[0.9, 0.1]);
        let b = hits("ocr", &[0.5]);
        let fused = fuse([&a, &b]);

        for (document, metadata, _) in fused.iter() {
            let source = metadata["source"].as_str().unwrap();
            assert!(document.starts_with(source));
        }
    }

    #[test]
    fn empty_input_fuses_to_empty() {
        let none: [&CollectionHits; 0] = [];
        let fused = fuse(none);
        assert!(fused.is_empty());
        assert_eq!(fused.len(), 0);
    }

    #[test]
    fn from_parts_rejects_mismatched_lengths() {
        let err = FusedResults::from_parts(
            vec!["doc".to_string()],
            vec![],
            vec![0.1],
        )
        .unwrap_err();
        assert_eq!(err.documents, 1);
        assert_eq!(err.metadatas, 0);
    }
}
