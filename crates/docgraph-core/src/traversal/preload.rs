use crate::errors::Result;
use crate::model::{Graph, Link, Node};

/// Fetches one relation target by identity and hydrates it in place
pub trait Resolver {
    /// # Errors
    ///
    /// `NotFound` when no document carries the target's identity; any
    /// identity or transport failure otherwise.
    fn resolve(&mut self, collection: &str, target: &mut dyn Node) -> Result<()>;
}

/// Hydrate every relation target reachable from `graph`
///
/// Relation fields are resolved target by target, in declaration order and
/// sequence order. Targets with an empty identity are skipped. Nested
/// composites are descended into. The first failure aborts the walk; targets
/// hydrated before it stay hydrated.
///
/// # Errors
///
/// The first error returned by `resolver`.
pub fn preload<R, G>(resolver: &mut R, graph: &mut G) -> Result<()>
where
    R: Resolver + ?Sized,
    G: Graph + ?Sized,
{
    let mut index = 0;

    while let Some(edge) = graph.edge(index) {
        index += 1;

        match edge.link {
            Link::Relation { targets, .. } => {
                for target in targets {
                    if target.node.identity().is_empty() {
                        tracing::trace!(relation = edge.name, "skipping target without identity");
                        continue;
                    }

                    tracing::debug!(
                        relation = edge.name,
                        collection = target.collection,
                        entity_id = target.node.identity(),
                        "resolving relation target"
                    );
                    resolver.resolve(target.collection, target.node)?;
                }
            }
            Link::Nested(children) => {
                for child in children {
                    preload(resolver, child)?;
                }
            }
        }
    }

    Ok(())
}

/// [`preload`] over an ordered sequence of graphs
///
/// # Errors
///
/// The first error returned by `resolver`.
pub fn preload_all<R, G>(resolver: &mut R, items: &mut [G]) -> Result<()>
where
    R: Resolver + ?Sized,
    G: Graph,
{
    for item in items {
        preload(resolver, item)?;
    }
    Ok(())
}
