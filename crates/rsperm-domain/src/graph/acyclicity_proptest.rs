//! Property-based tests for the acyclicity invariant.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::graph::InheritanceGraph;
    use rsperm_storage::MemoryRecordStore;

    /// Strategy: an arbitrary sequence of candidate edges over a small id
    /// space, dense enough that cycle attempts are frequent.
    fn edge_sequence_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
        proptest::collection::vec((0i64..8, 0i64..8), 1..40)
    }

    proptest! {
        #[test]
        fn test_no_edge_sequence_makes_a_resource_its_own_ancestor(
            edges in edge_sequence_strategy()
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let graph = InheritanceGraph::new(MemoryRecordStore::new_shared());

                for (parent, child) in &edges {
                    // Self-loops and cycle closures fail; everything else
                    // lands. Either way the invariant below must hold.
                    let _ = graph.add_edge(*parent, *child).await;
                }

                for node in 0i64..8 {
                    let ancestors = graph.ancestors_of(node).await.unwrap();
                    prop_assert!(
                        !ancestors.contains(&node),
                        "resource {} became its own ancestor via {:?}",
                        node,
                        edges
                    );
                }
                Ok(())
            })?;
        }
    }
}
