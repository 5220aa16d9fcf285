use super::attach::{attach_mid_span, Attachment};
use super::*;
use crate::app::overlap::{Overlap, OverlapTarget};
use crate::core::{
    Branch, ConnectionSlot, CustomData, NodeKind, RoadCatalog, RoadData, Spline,
};
use crate::shared::ConstructionSettings;
use approx::assert_relative_eq;
use glam::Vec3;

fn two_lane() -> std::sync::Arc<crate::core::RoadDescriptor> {
    RoadCatalog::default().get("two_lane").expect("Typ erwartet")
}

/// Legt eine freie Strasse im Batch an.
fn put_road(ctx: &mut BatchContext<'_>, from: Vec3, to: Vec3) -> ObjectId {
    let id = ctx.allocate_id();
    let descriptor = two_lane();
    let data = RoadData::new(Spline::straight(from, to), descriptor.width());
    ctx.put(SceneObject::new(id, descriptor, false, ObjectKind::Road(data)));
    id
}

fn node_overlap(id: ObjectId, kind: NodeKind, position: Vec3) -> Overlap {
    Overlap {
        target: OverlapTarget::Node { id, kind },
        ..Overlap::nothing(position)
    }
}

fn commit(system: &RoadSystem, mut ctx: BatchContext<'_>) -> RoadSystem {
    ctx.finalize_geometry();
    let (objects, fails) = ctx.finish();
    assert!(fails.is_empty(), "unerwartete Fehlschläge: {:?}", fails);
    let (next, _) = system.applied(&objects).expect("Commit erwartet");
    assert!(next.check_symmetry().is_empty());
    next
}

/// Strasse (0,0,0) → (20,0,0) mit Abschlüssen an beiden Enden.
fn single_road(settings: &ConstructionSettings) -> (RoadSystem, ObjectId) {
    let empty = RoadSystem::new();
    let mut ctx = BatchContext::new(&empty, settings);
    let road = put_road(&mut ctx, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
    attach_end(&mut ctx, road, 0, &Overlap::nothing(Vec3::ZERO));
    attach_end(&mut ctx, road, 1, &Overlap::nothing(Vec3::new(20.0, 0.0, 0.0)));
    (commit(&empty, ctx), road)
}

fn end_node(system: &RoadSystem, road: ObjectId, at_start: bool) -> ObjectId {
    let data = system.get(road).and_then(SceneObject::as_road).expect("Strasse erwartet");
    let link = if at_start { data.start } else { data.end };
    link.node().expect("Knoten erwartet")
}

fn road_data<'a>(lookup: &'a dyn ObjectLookup, id: ObjectId) -> &'a RoadData {
    lookup.road(id).expect("Strasse erwartet")
}

#[test]
fn free_ends_receive_end_caps() {
    let settings = ConstructionSettings::default();
    let (system, road) = single_road(&settings);

    assert_eq!(system.road_count(), 1);
    assert_eq!(system.node_count(), 2);
    let cap = system.get(end_node(&system, road, false)).expect("Abschluss erwartet");
    assert_eq!(cap.node_kind(), Some(NodeKind::EndCap));
    assert_eq!(cap.branches(), &[Branch::new(road, 1)]);
    assert!(!cap.lods.is_empty());
}

#[test]
fn free_ends_stay_free_without_end_caps() {
    let settings = ConstructionSettings {
        end_caps: false,
        ..Default::default()
    };
    let (system, road) = single_road(&settings);

    assert_eq!(system.node_count(), 0);
    assert_eq!(road_data(&system, road).start, EndpointLink::Free);
}

#[test]
fn corner_shortens_both_branches() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);
    let corner = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0));
    let attachment = attach_end(
        &mut ctx,
        r2,
        0,
        &node_overlap(corner, NodeKind::EndCap, Vec3::new(20.0, 0.0, 0.0)),
    );
    assert_eq!(
        attachment,
        Some(Attachment {
            node: corner,
            focus: Some(r2)
        })
    );
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(20.0, 0.0, 20.0)));
    assert_eq!(collapse_if_straight(&mut ctx, corner), None);
    apply_clearance(&mut ctx, corner, Some(r2));
    let system = commit(&system, ctx);

    // Zweispurig: 11 m breit, Lücke 1 m → 6,5 m Abstand vom Zentrum
    assert_relative_eq!(road_data(&system, r1).length, 13.5, epsilon = 0.05);
    let second = road_data(&system, r2);
    assert_relative_eq!(second.spline.first_position().z, 6.5, epsilon = 0.05);
    assert_relative_eq!(second.spline.last_position().z, 20.0, epsilon = 1e-3);
    assert_eq!(system.get(corner).map(|o| o.branches().len()), Some(2));
}

#[test]
fn colinear_continuation_collapses_into_one_road() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);
    let joint = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(20.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0));
    attach_end(
        &mut ctx,
        r2,
        0,
        &node_overlap(joint, NodeKind::EndCap, Vec3::new(20.0, 0.0, 0.0)),
    );
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(40.0, 0.0, 0.0)));
    assert_eq!(collapse_if_straight(&mut ctx, joint), Some(r1));
    let system = commit(&system, ctx);

    assert!(!system.contains(joint));
    assert!(!system.contains(r2));
    let merged = road_data(&system, r1);
    assert_eq!(merged.spline.knot_count(), 3);
    assert_relative_eq!(merged.length, 40.0, epsilon = 0.05);
    let far = system.get(end_node(&system, r1, false)).expect("Abschluss erwartet");
    assert_eq!(far.branches(), &[Branch::new(r1, 2)]);
}

#[test]
fn mid_span_attach_splits_road_around_new_node() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);
    let far_cap = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 20.0));
    let attachment = attach_mid_span(&mut ctx, r1, Vec3::new(10.0, 0.0, 0.0), Branch::new(r2, 0))
        .expect("Anschluss erwartet");
    assert_eq!(attachment.focus, None);
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(10.0, 0.0, 20.0)));
    apply_clearance(&mut ctx, attachment.node, None);
    let system = commit(&system, ctx);

    let node = system.get(attachment.node).expect("Kreuzung erwartet");
    assert_eq!(node.node_kind(), Some(NodeKind::Intersection));
    assert_eq!(node.branches().len(), 3);

    let head = road_data(&system, r1);
    assert_eq!(head.split_original_id, Some(r1));
    assert_relative_eq!(head.spline.last_position().x, 10.0 - 6.5, epsilon = 0.05);

    // Der Abschluss am Ende verweist jetzt auf das zweite Teilstück
    let tail_branch = system.get(far_cap).expect("Abschluss erwartet").branches()[0];
    assert_ne!(tail_branch.road, r1);
    let tail = road_data(&system, tail_branch.road);
    assert_eq!(tail.split_original_id, Some(r1));
    assert_eq!(tail.start, EndpointLink::Node { id: attachment.node });
}

#[test]
fn removing_crossing_road_restores_split_original() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 20.0));
    let attachment = attach_mid_span(&mut ctx, r1, Vec3::new(10.0, 0.0, 0.0), Branch::new(r2, 0))
        .expect("Anschluss erwartet");
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(10.0, 0.0, 20.0)));
    apply_clearance(&mut ctx, attachment.node, None);
    let before_split = road_data(&system, r1).spline.clone();
    let system = commit(&system, ctx);
    assert_eq!(system.road_count(), 3);
    let provenance = road_data(&system, r1)
        .split_original_spline
        .clone()
        .expect("Herkunfts-Kurve erwartet");
    assert_eq!(provenance, before_split);

    let mut ctx = BatchContext::new(&system, &settings);
    remove_road(&mut ctx, r2);
    let system = commit(&system, ctx);

    assert_eq!(system.road_count(), 1);
    assert_eq!(system.node_count(), 2);
    let restored = road_data(&system, r1);
    assert_relative_eq!(restored.length, 20.0, epsilon = 0.05);
    assert_eq!(restored.split_original_id, None);
    assert_eq!(restored.spline.knots().len(), provenance.knots().len());
    for (got, want) in restored.spline.knots().iter().zip(provenance.knots()) {
        assert!(got.position.abs_diff_eq(want.position, 1e-4), "{got:?} != {want:?}");
        assert!(got.tangent_in.abs_diff_eq(want.tangent_in, 1e-4), "{got:?} != {want:?}");
        assert!(got.tangent_out.abs_diff_eq(want.tangent_out, 1e-4), "{got:?} != {want:?}");
    }
}

#[test]
fn demolishing_node_removes_branches_and_orphaned_caps() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);
    let corner = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0));
    attach_end(
        &mut ctx,
        r2,
        0,
        &node_overlap(corner, NodeKind::EndCap, Vec3::new(20.0, 0.0, 0.0)),
    );
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(20.0, 0.0, 20.0)));
    apply_clearance(&mut ctx, corner, Some(r2));
    let system = commit(&system, ctx);
    assert_eq!(system.len(), 5);

    let mut ctx = BatchContext::new(&system, &settings);
    demolish_node(&mut ctx, corner);
    let system = commit(&system, ctx);
    assert!(system.is_empty());
}

#[test]
fn removing_end_of_corner_turns_node_into_cap() {
    let settings = ConstructionSettings::default();
    let (system, r1) = single_road(&settings);
    let corner = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0));
    attach_end(
        &mut ctx,
        r2,
        0,
        &node_overlap(corner, NodeKind::EndCap, Vec3::new(20.0, 0.0, 0.0)),
    );
    attach_end(&mut ctx, r2, 1, &Overlap::nothing(Vec3::new(20.0, 0.0, 20.0)));
    apply_clearance(&mut ctx, corner, Some(r2));
    let system = commit(&system, ctx);

    let mut ctx = BatchContext::new(&system, &settings);
    remove_road(&mut ctx, r2);
    let system = commit(&system, ctx);

    assert_eq!(
        system.get(corner).and_then(SceneObject::node_kind),
        Some(NodeKind::EndCap)
    );
    // Die verbleibende Strasse reicht wieder bis zum Zentrum
    assert_relative_eq!(road_data(&system, r1).length, 20.0, epsilon = 0.05);
}

#[test]
fn snapping_occupies_slot_and_removal_frees_it() {
    let settings = ConstructionSettings::default();
    let empty = RoadSystem::new();
    let mut ctx = BatchContext::new(&empty, &settings);
    let custom = ctx.allocate_id();
    ctx.put(SceneObject::new(
        custom,
        two_lane(),
        false,
        ObjectKind::Custom(CustomData {
            slots: vec![ConnectionSlot {
                position: Vec3::new(20.0, 0.0, 0.0),
                direction: -Vec3::X,
                occupant: None,
            }],
        }),
    ));
    let road = put_road(&mut ctx, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
    attach_end(&mut ctx, road, 0, &Overlap::nothing(Vec3::ZERO));
    let snapped = attach_end(
        &mut ctx,
        road,
        1,
        &Overlap {
            target: OverlapTarget::Slot {
                target: custom,
                slot: 0,
            },
            ..Overlap::nothing(Vec3::new(20.0, 0.0, 0.0))
        },
    );
    assert_eq!(snapped, None);
    let system = commit(&empty, ctx);
    assert_eq!(
        road_data(&system, road).end,
        EndpointLink::Snapped {
            target: custom,
            slot: 0
        }
    );

    let mut ctx = BatchContext::new(&system, &settings);
    remove_road(&mut ctx, road);
    let slot_occupant = ctx.get(custom).and_then(|o| match &o.kind {
        ObjectKind::Custom(data) => data.slots[0].occupant,
        _ => None,
    });
    assert_eq!(slot_occupant, None);
}

#[test]
fn removing_custom_object_caps_snapped_ends() {
    let settings = ConstructionSettings::default();
    let empty = RoadSystem::new();
    let mut ctx = BatchContext::new(&empty, &settings);
    let custom = ctx.allocate_id();
    ctx.put(SceneObject::new(
        custom,
        two_lane(),
        false,
        ObjectKind::Custom(CustomData {
            slots: vec![ConnectionSlot {
                position: Vec3::ZERO,
                direction: Vec3::X,
                occupant: None,
            }],
        }),
    ));
    let road = put_road(&mut ctx, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
    attach_end(
        &mut ctx,
        road,
        0,
        &Overlap {
            target: OverlapTarget::Slot {
                target: custom,
                slot: 0,
            },
            ..Overlap::nothing(Vec3::ZERO)
        },
    );
    attach_end(&mut ctx, road, 1, &Overlap::nothing(Vec3::new(20.0, 0.0, 0.0)));
    let system = commit(&empty, ctx);

    let mut ctx = BatchContext::new(&system, &settings);
    remove_custom(&mut ctx, custom);
    let system = commit(&system, ctx);

    assert!(!system.contains(custom));
    let start = road_data(&system, road).start.node().expect("Abschluss erwartet");
    assert_eq!(
        system.get(start).and_then(SceneObject::node_kind),
        Some(NodeKind::EndCap)
    );
}

#[test]
fn elevated_intersections_can_be_disabled() {
    let settings = ConstructionSettings {
        elevated_intersections: false,
        ..Default::default()
    };
    let (system, r1) = single_road(&settings);
    let corner = end_node(&system, r1, false);

    let mut ctx = BatchContext::new(&system, &settings);
    let r2 = put_road(&mut ctx, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0));
    if let Some(mut object) = ctx.cloned(r2) {
        object.elevated = true;
        ctx.put(object);
    }
    attach_end(
        &mut ctx,
        r2,
        0,
        &node_overlap(corner, NodeKind::EndCap, Vec3::new(20.0, 0.0, 0.0)),
    );
    apply_clearance(&mut ctx, corner, Some(r2));
    assert!(ctx.has_fail(crate::app::construction::ConstructionFail::ElevatedIntersection));
}
