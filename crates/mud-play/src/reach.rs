//! Reach predicates (§4.7): symmetric tests of whether one entity's
//! position can interact with another's, plus the shared `find` lookup
//! every targeting command goes through.

use mud_core::EntityId;
use mud_world::components::{Noun, Transform};
use mud_world::entity::EntityStore;

/// View radius in tiles along each axis, matching the client's visible
/// chip window.
pub const VIEW_WIDTH: i32 = 7;
pub const VIEW_HEIGHT: i32 = 7;

pub type Reach = fn(Transform, Transform) -> bool;

/// Same cell. Symmetric, transitive, reflexive — melee range and
/// stance-prop interactions use this, not a radius.
pub fn adjacent(this: Transform, that: Transform) -> bool {
    this == that
}

/// Within the client's visible chip window. Symmetric, but not transitive
/// (A can see B and B can see C without A seeing C).
pub fn visible(this: Transform, that: Transform) -> bool {
    this.map_id == that.map_id
        && (this.x - that.x).abs() <= VIEW_WIDTH
        && (this.y - that.y).abs() <= VIEW_HEIGHT
}

/// No positional constraint at all — same map only.
pub fn world(this: Transform, that: Transform) -> bool {
    this.map_id == that.map_id
}

/// Chebyshev-disk reach of explicit radius `(r_y, r_x)`, used for den wake
/// radii and other named-radius neighborhoods that aren't the fixed view
/// window.
pub fn chebyshev(r_y: i32, r_x: i32) -> impl Fn(Transform, Transform) -> bool {
    move |this, that| this.map_id == that.map_id && (this.y - that.y).abs() <= r_y && (this.x - that.x).abs() <= r_x
}

/// Find the first entity (by creation order) whose noun starts with
/// `prefix` and satisfies `reach` relative to `source`.
pub fn find<'a>(
    store: &'a EntityStore,
    source: EntityId,
    prefix: &'a str,
    reach: impl Fn(Transform, Transform) -> bool + 'a,
) -> impl Iterator<Item = (EntityId, &'a Noun, Transform)> + 'a {
    let source_loc = store.try_component::<Transform>(source).copied();
    store.query::<Noun>().filter_map(move |(other, noun)| {
        if other == source {
            return None;
        }
        if !noun.value.starts_with(prefix) {
            return None;
        }
        let other_loc = *store.try_component::<Transform>(other)?;
        let source_loc = source_loc?;
        reach(other_loc, source_loc).then_some((other, noun, other_loc))
    })
}
