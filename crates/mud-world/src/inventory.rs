//! Item templates, instantiation, and containment save/load (§4.9).
//!
//! A "component type → instance" template table, expressed here as a data
//! table of setup functions — the same data-table idiom the command
//! dispatcher (`mud-play::commands`) uses in place of class-based
//! polymorphism (§9 Design Notes).

use mud_core::EntityId;

use crate::components::{ContainedBy, Glyph, Noun, Slot, Transform};
use crate::entity::EntityStore;
use crate::error::{WorldError, WorldResult};
use crate::items::{
    Armor, Container, Cookware, Food, Ingredient, ItemKey, Level, ProvidesHeat, ProvidesLight,
    ProvidesShelter, Rotting, Weapon, Wearable,
};

/// One row of an item template: a key plus the function that attaches its
/// default components to a freshly created entity.
pub struct ItemTemplate {
    pub key: &'static str,
    apply: fn(&mut EntityStore, EntityId),
}

pub static ITEM_TEMPLATES: &[ItemTemplate] = &[
    ItemTemplate {
        key: "scenery",
        apply: |store, e| {
            store.add_component(e, ItemKey("scenery".into()));
            store.add_component(e, Noun::new("scenery").with_num(2));
            store.add_component(e, Glyph::new('ო', 0.33, 0.6, 0.6));
        },
    },
    ItemTemplate {
        key: "prop",
        apply: |store, e| {
            store.add_component(e, ItemKey("prop".into()));
            store.add_component(e, Noun::new("prop"));
            store.add_component(e, Glyph::new('?', 0.0, 0.0, 0.7));
        },
    },
    ItemTemplate {
        key: "torch",
        apply: |store, e| {
            store.add_component(e, ItemKey("torch".into()));
            store.add_component(e, Noun::new("torch"));
            store.add_component(e, Glyph::new('!', 0.1, 0.8, 0.9));
            store.add_component(e, ProvidesLight);
        },
    },
    ItemTemplate {
        key: "bonfire",
        apply: |store, e| {
            store.add_component(e, ItemKey("bonfire".into()));
            store.add_component(e, Noun::new("bonfire"));
            store.add_component(e, Glyph::new('⚶', 0.95, 0.6, 0.65));
            store.add_component(e, ProvidesHeat);
            store.add_component(e, ProvidesLight);
            store.add_component(
                e,
                crate::components::Anchor {
                    rank: 1,
                    tnl: 0.0,
                    threshold: 6,
                    fuel: None,
                },
            );
        },
    },
    ItemTemplate {
        key: "broadsword",
        apply: |store, e| {
            store.add_component(e, ItemKey("broadsword".into()));
            store.add_component(e, Noun::new("broadsword"));
            store.add_component(e, Glyph::new('/', 0.0, 0.1, 0.8));
            store.add_component(
                e,
                Weapon {
                    damage: 15.0,
                    token_key: "slash",
                    story_key: "blade",
                    skill_key: "martial_arts",
                },
            );
        },
    },
    ItemTemplate {
        key: "leather_armor",
        apply: |store, e| {
            store.add_component(e, ItemKey("leather_armor".into()));
            store.add_component(e, Noun::new("armor").with_adjective("leather"));
            store.add_component(e, Glyph::new(']', 0.1, 0.35, 0.55));
            store.add_component(e, Wearable { slot: Slot::Armor });
            store.add_component(
                e,
                Armor {
                    required_skill: "heavy_armor",
                    item_rank: 10.0,
                    physical_immunity: 0.45,
                    magical_immunity: 0.1,
                },
            );
        },
    },
    ItemTemplate {
        key: "backpack",
        apply: |store, e| {
            store.add_component(e, ItemKey("backpack".into()));
            store.add_component(e, Noun::new("backpack"));
            store.add_component(e, Glyph::new('(', 0.08, 0.5, 0.5));
            store.add_component(e, Container);
            store.add_component(e, Wearable { slot: Slot::Back });
        },
    },
    ItemTemplate {
        key: "bedroll",
        apply: |store, e| {
            store.add_component(e, ItemKey("bedroll".into()));
            store.add_component(e, Noun::new("bedroll").with_adjective("leather"));
            store.add_component(e, Glyph::new('=', 0.1, 0.4, 0.5));
            store.add_component(
                e,
                ProvidesShelter {
                    prompt: "settle into bedroll".into(),
                },
            );
        },
    },
    ItemTemplate {
        key: "cookpot",
        apply: |store, e| {
            store.add_component(e, ItemKey("cookpot".into()));
            store.add_component(e, Noun::new("cookpot").with_adjective("crude"));
            store.add_component(e, Glyph::new('u', 0.08, 0.3, 0.4));
            store.add_component(e, Container);
            store.add_component(e, Cookware);
        },
    },
    ItemTemplate {
        key: "meal",
        apply: |store, e| {
            store.add_component(e, ItemKey("meal".into()));
            store.add_component(e, Noun::new("meal"));
            store.add_component(e, Glyph::new('ʘ', 0.33, 0.65, 0.55));
            store.add_component(e, Food { count: 1 });
            store.add_component(e, Rotting);
        },
    },
    ItemTemplate {
        key: "forage",
        apply: |store, e| {
            store.add_component(e, ItemKey("forage".into()));
            store.add_component(e, Noun::new("forage").with_num(2));
            store.add_component(e, Glyph::new('♣', 0.33, 0.65, 0.55));
            store.add_component(e, Ingredient);
        },
    },
    ItemTemplate {
        key: "corpse",
        apply: |store, e| {
            store.add_component(e, ItemKey("corpse".into()));
            store.add_component(e, Noun::new("corpse"));
            store.add_component(e, Glyph::new('%', 0.0, 0.0, 0.4));
            store.add_component(e, Rotting);
            store.add_component(e, crate::components::DoNotSave);
        },
    },
];

fn find_template(key: &str) -> Option<&'static ItemTemplate> {
    ITEM_TEMPLATES.iter().find(|t| t.key == key)
}

/// Override applied on top of a template, for state that differs from the
/// template default (the "diff" written by [`ItemState::from_entity`]).
pub enum Override {
    Noun(Noun),
    Food(Food),
    Glyph(Glyph),
}

/// Create an entity from a template, then layer overrides, then attach
/// position/level/containment. Required: transform, level. Optional:
/// contained_by (defaults to none), slot (defaults to Any).
pub fn create_item(
    store: &mut EntityStore,
    key: &str,
    overrides: &[Override],
    transform: Transform,
    level: u32,
    contained_by: Option<EntityId>,
    slot: Slot,
) -> WorldResult<EntityId> {
    let template = find_template(key).ok_or_else(|| WorldError::UnknownItemKey(key.to_string()))?;
    let entity = store.create_entity();
    (template.apply)(store, entity);
    for over in overrides {
        match over.clone_into_component() {
            OverrideComponent::Noun(n) => store.add_component(entity, n),
            OverrideComponent::Food(f) => store.add_component(entity, f),
            OverrideComponent::Glyph(g) => store.add_component(entity, g),
        }
    }
    store.add_component(entity, transform);
    store.add_component(entity, slot);
    store.add_component(entity, Level(level));
    store.add_component(entity, ContainedBy(contained_by.unwrap_or(EntityId(0))));
    Ok(entity)
}

enum OverrideComponent {
    Noun(Noun),
    Food(Food),
    Glyph(Glyph),
}

impl Override {
    fn clone_into_component(&self) -> OverrideComponent {
        match self {
            Override::Noun(n) => OverrideComponent::Noun(n.clone()),
            Override::Food(f) => OverrideComponent::Food(*f),
            Override::Glyph(g) => OverrideComponent::Glyph(*g),
        }
    }
}

/// Serializable state for the item components that can change at runtime:
/// `noun`, `food` count, and `glyph`.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ItemState {
    pub noun: Option<(String, Option<String>, u32)>,
    pub food: Option<u32>,
    pub glyph: Option<(char, u16, u16, u16)>,
}

impl ItemState {
    /// Capture only the components that differ from `key`'s template.
    pub fn from_entity(store: &EntityStore, entity: EntityId, key: &str) -> Self {
        let mut state = ItemState::default();
        let template_noun = template_component::<Noun>(key);
        if let Some(noun) = store.try_component::<Noun>(entity) {
            if template_noun.as_ref() != Some(noun) {
                state.noun = Some((noun.value.clone(), noun.adjective.clone(), noun.num));
            }
        }
        let template_food = template_component::<Food>(key);
        if let Some(food) = store.try_component::<Food>(entity) {
            if template_food.as_ref() != Some(food) {
                state.food = Some(food.count);
            }
        }
        let template_glyph = template_component::<Glyph>(key);
        if let Some(glyph) = store.try_component::<Glyph>(entity) {
            if template_glyph.as_ref() != Some(glyph) {
                state.glyph = Some((glyph.ch, glyph.h_milli, glyph.s_milli, glyph.v_milli));
            }
        }
        state
    }

    pub fn overrides(&self) -> Vec<Override> {
        let mut out = Vec::new();
        if let Some((value, adjective, num)) = &self.noun {
            let mut n = Noun::new(value.clone()).with_num(*num);
            if let Some(adj) = adjective {
                n = n.with_adjective(adj.clone());
            }
            out.push(Override::Noun(n));
        }
        if let Some(count) = self.food {
            out.push(Override::Food(Food { count }));
        }
        if let Some((ch, h, s, v)) = self.glyph {
            out.push(Override::Glyph(Glyph {
                ch,
                h_milli: h,
                s_milli: s,
                v_milli: v,
            }));
        }
        out
    }
}

/// Instantiate a scratch entity from `key`'s template and read back its
/// `T` component, for use as the comparison baseline in `from_entity`.
fn template_component<T: 'static + Send + Clone>(key: &str) -> Option<T> {
    let Some(template) = find_template(key) else {
        return None;
    };
    let mut scratch = EntityStore::new();
    let e = scratch.create_entity();
    (template.apply)(&mut scratch, e);
    scratch.try_component::<T>(e).cloned()
}

/// One persisted inventory row.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct InventoryRow {
    pub eid: u64,
    pub key: String,
    pub slot: Slot,
    pub container_eid: u64,
    pub map_id: Option<u64>,
    pub x: i32,
    pub y: i32,
    pub state: ItemState,
    pub level: u32,
    pub owner_id: u64,
}

/// DFS-order traversal from `roots`, collecting a diff-efficient row per
/// descendant reachable through `Container`-tagged entities, skipping
/// anything tagged [`crate::components::DoNotSave`].
fn collect_rows(
    store: &EntityStore,
    roots: Vec<(EntityId, Option<Transform>)>,
    owner_id: u64,
) -> Vec<InventoryRow> {
    let mut rows = Vec::new();
    let mut entity_to_eid: rustc_hash::FxHashMap<EntityId, u64> = Default::default();
    let mut seen: rustc_hash::FxHashSet<EntityId> = Default::default();
    let mut stack: Vec<EntityId> = Vec::new();
    let mut next_eid = 1u64;

    for (root, transform) in roots {
        if store.has_component::<crate::components::DoNotSave>(root) {
            continue;
        }
        seen.insert(root);
        let Some(key) = store.try_component::<ItemKey>(root) else {
            continue;
        };
        rows.push(InventoryRow {
            eid: next_eid,
            key: key.0.clone(),
            slot: Slot::Any,
            container_eid: 0,
            map_id: transform.map(|t| t.map_id.0),
            x: transform.map(|t| t.x).unwrap_or(-1),
            y: transform.map(|t| t.y).unwrap_or(-1),
            state: ItemState::from_entity(store, root, &key.0),
            level: store.try_component::<Level>(root).map(|l| l.0).unwrap_or(0),
            owner_id,
        });
        entity_to_eid.insert(root, next_eid);
        next_eid += 1;
        if store.has_component::<Container>(root) {
            stack.push(root);
        }
    }

    while let Some(container) = stack.pop() {
        for (entity, contained_by) in store.query::<ContainedBy>() {
            if contained_by.0 != container || seen.contains(&entity) {
                continue;
            }
            if store.has_component::<crate::components::DoNotSave>(entity) {
                continue;
            }
            let Some(key) = store.try_component::<ItemKey>(entity) else {
                continue;
            };
            seen.insert(entity);
            let slot = store.try_component::<Slot>(entity).copied().unwrap_or_default();
            rows.push(InventoryRow {
                eid: next_eid,
                key: key.0.clone(),
                slot,
                container_eid: entity_to_eid[&container],
                map_id: None,
                x: -1,
                y: -1,
                state: ItemState::from_entity(store, entity, &key.0),
                level: store.try_component::<Level>(entity).map(|l| l.0).unwrap_or(0),
                owner_id,
            });
            entity_to_eid.insert(entity, next_eid);
            next_eid += 1;
            if store.has_component::<Container>(entity) {
                stack.push(entity);
            }
        }
    }

    rows
}

/// Save a player's inventory: every entity transitively contained by
/// `owner_entity`.
pub fn save_player_inventory(
    store: &EntityStore,
    owner_id: u64,
    owner_entity: EntityId,
) -> Vec<InventoryRow> {
    let roots: Vec<(EntityId, Option<Transform>)> = store
        .query::<ContainedBy>()
        .filter(|(_, c)| c.0 == owner_entity)
        .map(|(e, _)| (e, None))
        .collect();
    // Re-key container_eid=0 rows against the owner by collecting directly
    // through a synthetic pass rooted at the owner's direct children.
    collect_rows(store, roots, owner_id)
}

/// Save world-space inventory for one map: root items with a `Transform`
/// on that map and no containment edge, plus everything nested inside them.
pub fn save_map_inventory(store: &EntityStore, map_id: EntityId) -> Vec<InventoryRow> {
    let roots: Vec<(EntityId, Option<Transform>)> = store
        .query::<ItemKey>()
        .filter_map(|(e, _)| {
            let transform = store.try_component::<Transform>(e)?;
            if transform.map_id != map_id {
                return None;
            }
            if store.has_component::<ContainedBy>(e) {
                return None;
            }
            Some((e, Some(*transform)))
        })
        .collect();
    collect_rows(store, roots, 0)
}

/// Two-pass load: create every entity from its template + stored overrides
/// with `ContainedBy = 0`, then wire up containment edges in a second pass
/// (so a child never references a not-yet-created parent).
pub fn load_rows(
    store: &mut EntityStore,
    rows: &[InventoryRow],
    owner_entity: Option<EntityId>,
) -> WorldResult<Vec<EntityId>> {
    let mut entity_by_eid: rustc_hash::FxHashMap<u64, EntityId> = Default::default();

    for row in rows {
        let transform = match row.map_id {
            Some(map_id) if row.container_eid == 0 => Transform {
                map_id: EntityId(map_id),
                y: row.y,
                x: row.x,
            },
            _ => Transform::ORIGIN,
        };
        let entity = create_item(
            store,
            &row.key,
            &row.state.overrides(),
            transform,
            row.level,
            None,
            row.slot,
        )?;
        entity_by_eid.insert(row.eid, entity);
    }

    for row in rows {
        let entity = entity_by_eid[&row.eid];
        let container = if row.container_eid != 0 {
            *entity_by_eid
                .get(&row.container_eid)
                .ok_or(WorldError::ContainmentCycle(entity))?
        } else if let Some(owner) = owner_entity {
            owner
        } else {
            continue;
        };
        store.add_component(entity, ContainedBy(container));
    }

    Ok(entity_by_eid.into_values().collect())
}
