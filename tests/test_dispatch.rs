//! Integration test: Routing, dispatch and reconciliation

use std::sync::Arc;
use survey_inference::inference::{reconcile, ClusterRouter, ModelDispatcher};
use survey_inference::models::{
    DecisionTree, FileModelStore, InMemoryModelStore, KMeans, LinearRegression,
    LogisticRegression, ModelArtifact, ModelStore, TreeNode,
};
use survey_inference::table::{RecordTable, RowId};
use survey_inference::PipelineError;

/// Five rows: positions 0, 2, 4 sit near centroid 0, positions 1, 3 near centroid 1
fn encoded() -> RecordTable {
    RecordTable::from_columns(vec![
        ("age".to_string(), vec![20.0.into(), 70.0.into(), 25.0.into(), 65.0.into(), 18.0.into()]),
        ("hasLand_Yes".to_string(), vec![1.0.into(), 0.0.into(), 1.0.into(), 0.0.into(), 1.0.into()]),
    ])
    .unwrap()
}

fn clustering() -> ModelArtifact {
    KMeans::new(vec![vec![20.0, 1.0], vec![70.0, 0.0]])
        .with_feature_names(vec!["age".to_string(), "hasLand_Yes".to_string()])
        .into()
}

fn store() -> Arc<dyn ModelStore> {
    Arc::new(
        InMemoryModelStore::new()
            .with_model("KMeans", clustering())
            .with_specialist(0, "Linear0", LinearRegression::new(vec![1.0, 0.0], 0.5))
            .with_specialist(
                1,
                "Tree1",
                DecisionTree::new(
                    2,
                    TreeNode::Split {
                        feature_idx: 0,
                        threshold: 66.0,
                        left: Box::new(TreeNode::Leaf { value: -1.0 }),
                        right: Box::new(TreeNode::Leaf { value: -2.0 }),
                    },
                ),
            ),
    )
}

#[test]
fn test_two_clusters_five_rows_in_input_order() {
    let store = store();
    let router = ClusterRouter::new("KMeans", store.load("KMeans").unwrap());
    let routed = router.assign(&encoded()).unwrap();

    let partials = ModelDispatcher::new(Arc::clone(&store)).dispatch(&routed).unwrap();
    assert_eq!(partials.len(), 2);
    assert_eq!(partials[0].row_ids.len(), 3);
    assert_eq!(partials[1].row_ids.len(), 2);

    let result = reconcile(encoded().row_ids(), &partials).unwrap();
    assert_eq!(result.len(), 5);
    assert_eq!(result.values, vec![20.5, -2.0, 25.5, -1.0, 18.5]);
    assert_eq!(result.get(RowId(3)), Some(-1.0));
}

#[test]
fn test_reconciliation_under_permuted_processing_order() {
    let store = store();
    let routed = ClusterRouter::new("KMeans", store.load("KMeans").unwrap())
        .assign(&encoded())
        .unwrap();
    let partials = ModelDispatcher::new(store).dispatch(&routed).unwrap();
    let expected = reconcile(routed.row_ids(), &partials).unwrap();

    // Every rotation of the partition list reconciles to the same result
    for shift in 0..partials.len() {
        let mut permuted = partials.clone();
        permuted.rotate_left(shift);
        assert_eq!(reconcile(routed.row_ids(), &permuted).unwrap(), expected);
    }
}

#[test]
fn test_parallel_dispatch_matches_sequential() {
    let store = store();
    let routed = ClusterRouter::new("KMeans", store.load("KMeans").unwrap())
        .assign(&encoded())
        .unwrap();

    let sequential = ModelDispatcher::new(Arc::clone(&store)).dispatch(&routed).unwrap();
    let parallel = ModelDispatcher::new(store)
        .with_parallel(true)
        .dispatch(&routed)
        .unwrap();
    assert_eq!(
        reconcile(routed.row_ids(), &sequential).unwrap(),
        reconcile(routed.row_ids(), &parallel).unwrap()
    );
}

#[test]
fn test_file_store_missing_specialist() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileModelStore::new(dir.path(), "KMeans");
    store.save("KMeans", &clustering()).unwrap();
    store
        .save("Logistic0", &LogisticRegression::new(vec![0.1, 1.0], -3.0).into())
        .unwrap();
    let store: Arc<dyn ModelStore> = Arc::new(store);

    let routed = ClusterRouter::new("KMeans", store.load("KMeans").unwrap())
        .assign(&encoded())
        .unwrap();
    let err = ModelDispatcher::new(store).dispatch(&routed).unwrap_err();
    assert!(matches!(err, PipelineError::ModelNotFound { cluster_id: 1 }));
}

#[test]
fn test_clustering_dimension_mismatch_is_fatal() {
    let model: ModelArtifact = KMeans::new(vec![vec![0.0, 0.0, 0.0]]).into();
    let err = ClusterRouter::new("KMeans", Arc::new(model))
        .assign(&encoded())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::DimensionMismatch { expected: 3, actual: 2, .. }
    ));
}
