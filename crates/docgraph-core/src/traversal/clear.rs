use crate::model::{Graph, Link};

/// Reduce every target of `graph`'s relation fields to an identity stub
///
/// Only the relation fields declared directly on `graph` are visited; nested
/// composites are left as they are. Targets with an empty identity are stubbed
/// too (they end up as defaults). Returns the number of stubbed targets.
pub fn clear<G: Graph + ?Sized>(graph: &mut G) -> usize {
    let mut stubbed = 0;
    let mut index = 0;

    while let Some(edge) = graph.edge(index) {
        index += 1;

        if let Link::Relation { targets, .. } = edge.link {
            for target in targets {
                target.node.reset_to_identity();
                stubbed += 1;
            }
        }
    }

    if stubbed > 0 {
        tracing::trace!(stubbed, "cleared relation targets");
    }
    stubbed
}
