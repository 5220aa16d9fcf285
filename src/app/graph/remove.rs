//! Entfernen von Strassen, Knoten und externen Objekten samt Nachpflege der Nachbarn.

use indexmap::IndexSet;

use crate::core::{
    Branch, EndpointLink, IntersectionData, KnotData, ObjectId, ObjectKind, SceneObject, SlotRef,
};

use super::attach::{cap_free_end, compatible, merge_through_node, set_slot_occupant};
use super::BatchContext;

/// Ersetzt den Verweis des Endes `link` von (`old_road`, `old_index`) auf
/// (`new_road`, `new_index`).
pub(crate) fn relink_end(
    ctx: &mut BatchContext<'_>,
    link: EndpointLink,
    old_road: ObjectId,
    old_index: usize,
    new_road: ObjectId,
    new_index: usize,
) {
    match link {
        EndpointLink::Free => {}
        EndpointLink::Node { id } => {
            let Some(mut node) = ctx.cloned(id) else {
                return;
            };
            let Some(branches) = node.branches_mut() else {
                return;
            };
            let Some(branch) = branches
                .iter_mut()
                .find(|b| b.road == old_road && b.knot_index == old_index)
            else {
                log::warn!("Knoten {} hat keinen Ast {}:{}", id, old_road, old_index);
                return;
            };
            *branch = Branch::new(new_road, new_index);
            ctx.put(node);
        }
        EndpointLink::Snapped { target, slot } => {
            if old_road != new_road {
                set_slot_occupant(ctx, SlotRef { target, slot }, Some(new_road));
            }
        }
    }
}

/// Gibt einen Slot frei, wenn er noch von `occupant` belegt ist.
fn free_slot(ctx: &mut BatchContext<'_>, slot: SlotRef, occupant: ObjectId) {
    let occupied_by = ctx.get(slot.target).and_then(|object| match &object.kind {
        ObjectKind::Custom(data) => data.slots.get(slot.slot).and_then(|s| s.occupant),
        _ => None,
    });
    if occupied_by == Some(occupant) {
        set_slot_occupant(ctx, slot, None);
    }
}

/// Entfernt eine Strasse und pflegt die Knoten an beiden Enden nach.
pub(crate) fn remove_road(ctx: &mut BatchContext<'_>, road_id: ObjectId) {
    let Some(road) = ctx.get(road_id).and_then(SceneObject::as_road).cloned() else {
        return;
    };
    ctx.remove(road_id);

    let mut nodes: IndexSet<ObjectId> = IndexSet::new();
    for link in [road.start, road.end] {
        match link {
            EndpointLink::Free => {}
            EndpointLink::Node { id } => {
                nodes.insert(id);
            }
            EndpointLink::Snapped { target, slot } => free_slot(ctx, SlotRef { target, slot }, road_id),
        }
    }
    for node in nodes {
        detach_branch(ctx, node, road_id);
    }
}

/// Entfernt die Äste einer Strasse aus einem Knoten.
///
/// - Kreisverkehr: bleibt bestehen
/// - Rampe: wird zur gewöhnlichen Kreuzung
/// - Kreuzung ohne Äste: entfällt
/// - ein Ast: Abschluss bzw. Einrasten am Slot, die Strasse reicht bis zum Zentrum
/// - zwei gleichartige Äste: werden zu einer Strasse zusammengelegt
pub(crate) fn detach_branch(ctx: &mut BatchContext<'_>, node_id: ObjectId, road_id: ObjectId) {
    let Some(mut node) = ctx.cloned(node_id) else {
        return;
    };
    let remaining: Vec<Branch> = node
        .branches()
        .iter()
        .copied()
        .filter(|b| b.road != road_id && ctx.get(b.road).is_some())
        .collect();

    if let ObjectKind::Ramp(data) = &node.kind {
        log::debug!("Rampe {} verliert einen Ast und wird zur Kreuzung", node_id);
        let center = data.center;
        node.kind = ObjectKind::Intersection(IntersectionData::new(center, Vec::new()));
    }

    match &mut node.kind {
        ObjectKind::Roundabout(data) => {
            data.branches = remaining;
            ctx.put(node);
        }
        ObjectKind::Intersection(data) => {
            data.branches = remaining.clone();
            let snap = data.snap;
            let center = data.center;
            match remaining.as_slice() {
                [] => {
                    ctx.remove(node_id);
                    if let Some(slot) = snap {
                        free_slot(ctx, slot, node_id);
                    }
                }
                [last] => {
                    let last = *last;
                    extend_to_center(ctx, last, center);
                    if let Some(slot) = snap {
                        ctx.remove(node_id);
                        ctx.update_road(last.road, |road| {
                            road.set_link_at(
                                last.knot_index,
                                EndpointLink::Snapped {
                                    target: slot.target,
                                    slot: slot.slot,
                                },
                            )
                        });
                        set_slot_occupant(ctx, slot, Some(last.road));
                    } else if ctx.settings.end_caps {
                        ctx.put(node);
                    } else {
                        ctx.remove(node_id);
                        ctx.update_road(last.road, |road| {
                            road.set_link_at(last.knot_index, EndpointLink::Free)
                        });
                    }
                }
                [a, b] => {
                    let mergeable = snap.is_none()
                        && a.road != b.road
                        && match (KnotData::from_branch(&*ctx, *a), KnotData::from_branch(&*ctx, *b)) {
                            (Some(ka), Some(kb)) => compatible(&ka, &kb),
                            _ => false,
                        };
                    ctx.put(node);
                    if mergeable {
                        merge_through_node(ctx, node_id);
                    }
                }
                _ => ctx.put(node),
            }
        }
        ObjectKind::Road(_) | ObjectKind::Custom(_) | ObjectKind::Ramp(_) => {}
    }
}

/// Verlängert das Ende eines Asts bis zum Knoten-Zentrum.
fn extend_to_center(ctx: &mut BatchContext<'_>, branch: Branch, center: glam::Vec3) {
    ctx.update_road(branch.road, |road| {
        let moved = road.spline.with_moved_end(branch.knot_index, center);
        road.set_spline(moved);
    });
}

/// Entfernt einen Knoten und anschliessend alle seine Äste.
pub(crate) fn demolish_node(ctx: &mut BatchContext<'_>, node_id: ObjectId) {
    let Some(node) = ctx.cloned(node_id) else {
        return;
    };
    ctx.remove(node_id);
    if let ObjectKind::Intersection(data) = &node.kind {
        if let Some(slot) = data.snap {
            free_slot(ctx, slot, node_id);
        }
    }
    let roads: IndexSet<ObjectId> = node.branches().iter().map(|b| b.road).collect();
    for road in roads {
        remove_road(ctx, road);
    }
}

/// Entfernt ein externes Objekt; eingerastete Enden werden wieder frei.
pub(crate) fn remove_custom(ctx: &mut BatchContext<'_>, custom_id: ObjectId) {
    let Some(object) = ctx.cloned(custom_id) else {
        return;
    };
    let ObjectKind::Custom(data) = &object.kind else {
        return;
    };
    ctx.remove(custom_id);

    for occupant in data.slots.iter().filter_map(|s| s.occupant) {
        let Some(occupant_object) = ctx.cloned(occupant) else {
            continue;
        };
        match &occupant_object.kind {
            ObjectKind::Road(road) => {
                let snapped: Vec<usize> = [(road.start, 0), (road.end, road.spline.last_index())]
                    .into_iter()
                    .filter(|(link, _)| matches!(link, EndpointLink::Snapped { target, .. } if *target == custom_id))
                    .map(|(_, index)| index)
                    .collect();
                for index in snapped {
                    cap_free_end(ctx, occupant, index);
                }
            }
            ObjectKind::Intersection(_) => {
                let mut node = occupant_object;
                if let ObjectKind::Intersection(data) = &mut node.kind {
                    data.snap = None;
                }
                ctx.put(node);
            }
            ObjectKind::Roundabout(_) | ObjectKind::Ramp(_) | ObjectKind::Custom(_) => {}
        }
    }
}
