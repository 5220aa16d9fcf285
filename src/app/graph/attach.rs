//! Anschließen von Strassen-Enden an Knoten, Slots und bestehende Strassen.

use glam::Vec3;

use crate::app::construction::ConstructionFail;
use crate::app::overlap::{Overlap, OverlapTarget};
use crate::core::{
    Branch, EndpointLink, IntersectionData, KnotData, ObjectId, ObjectKind, RoadData, SceneObject,
    SlotRef, Spline, KNOT_EPSILON,
};
use crate::shared::spline_geometry::{angle_between_deg, get_angle_distance, horizontal_distance};

use super::remove::relink_end;
use super::BatchContext;

/// Abstand zu einem Strassen-Ende, unter dem kein Split mehr entsteht.
const END_SNAP_DISTANCE: f32 = 0.5;
/// Maximale Abweichung beim Wiederfinden eines Split-Punkts auf der Wurzel-Strasse.
const PROVENANCE_TOLERANCE: f32 = 0.05;

/// Ergebnis eines Anschlusses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub node: ObjectId,
    /// Strasse, deren Nachbarn gekürzt werden; `None` = alle Äste
    pub focus: Option<ObjectId>,
}

/// Verbindet das Ende `knot_index` einer Strasse mit dem Overlap-Ziel.
pub(crate) fn attach_end(
    ctx: &mut BatchContext<'_>,
    road_id: ObjectId,
    knot_index: usize,
    overlap: &Overlap,
) -> Option<Attachment> {
    let branch = Branch::new(road_id, knot_index);
    match overlap.target {
        OverlapTarget::Nothing => cap_free_end(ctx, road_id, knot_index).map(|node| Attachment {
            node,
            focus: Some(road_id),
        }),
        OverlapTarget::Node { id, .. } => attach_to_node(ctx, id, branch).map(|node| Attachment {
            node,
            focus: Some(road_id),
        }),
        OverlapTarget::Slot { target, slot } => {
            snap_to_slot(ctx, branch, SlotRef { target, slot });
            None
        }
        OverlapTarget::Road {
            id,
            anchor: Some(anchor),
        } => anchor_intersection(ctx, Branch::new(id, anchor), branch).map(|node| Attachment {
            node,
            focus: None,
        }),
        OverlapTarget::Road { id, anchor: None } => {
            attach_mid_span(ctx, id, overlap.position, branch)
        }
    }
}

fn set_link(ctx: &mut BatchContext<'_>, branch: Branch, link: EndpointLink) {
    ctx.update_road(branch.road, |road| road.set_link_at(branch.knot_index, link));
}

/// Neuer Knoten an einem Strassen-Ende (Abschluss bzw. Kreuzung).
fn new_node(
    ctx: &mut BatchContext<'_>,
    template: ObjectId,
    center: Vec3,
    branches: Vec<Branch>,
    snap: Option<SlotRef>,
) -> Option<ObjectId> {
    let template = ctx.get(template)?;
    let (descriptor, elevated) = (template.road.clone(), template.elevated);
    let id = ctx.allocate_id();
    let mut data = IntersectionData::new(center, branches.clone());
    data.snap = snap;
    ctx.put(SceneObject::new(id, descriptor, elevated, ObjectKind::Intersection(data)));
    for branch in branches {
        set_link(ctx, branch, EndpointLink::Node { id });
    }
    Some(id)
}

/// Freies Ende: Abschluss-Knoten, wenn aktiviert.
pub(crate) fn cap_free_end(
    ctx: &mut BatchContext<'_>,
    road_id: ObjectId,
    knot_index: usize,
) -> Option<ObjectId> {
    if !ctx.settings.end_caps {
        set_link(ctx, Branch::new(road_id, knot_index), EndpointLink::Free);
        return None;
    }
    let position = ctx.get(road_id)?.as_road()?.spline.knot(knot_index)?.position;
    new_node(ctx, road_id, position, vec![Branch::new(road_id, knot_index)], None)
}

/// Hängt einen Ast an einen bestehenden Knoten.
pub(crate) fn attach_to_node(
    ctx: &mut BatchContext<'_>,
    node_id: ObjectId,
    branch: Branch,
) -> Option<ObjectId> {
    let mut node = ctx.cloned(node_id)?;
    match &mut node.kind {
        ObjectKind::Intersection(data) => data.branches.push(branch),
        ObjectKind::Roundabout(data) => data.branches.push(branch),
        ObjectKind::Ramp(_) => {
            log::debug!("Rampe {} nimmt keine weiteren Äste auf", node_id);
            ctx.fail(ConstructionFail::OverlapIntersection);
            return None;
        }
        ObjectKind::Road(_) | ObjectKind::Custom(_) => return None,
    }
    ctx.put(node);
    set_link(ctx, branch, EndpointLink::Node { id: node_id });
    Some(node_id)
}

/// Rastet ein Strassen-Ende an einem freien Slot ein.
fn snap_to_slot(ctx: &mut BatchContext<'_>, branch: Branch, slot: SlotRef) {
    set_link(
        ctx,
        branch,
        EndpointLink::Snapped {
            target: slot.target,
            slot: slot.slot,
        },
    );
    set_slot_occupant(ctx, slot, Some(branch.road));
}

pub(crate) fn set_slot_occupant(ctx: &mut BatchContext<'_>, slot: SlotRef, occupant: Option<ObjectId>) {
    let Some(mut object) = ctx.cloned(slot.target) else {
        return;
    };
    if let ObjectKind::Custom(data) = &mut object.kind {
        if let Some(entry) = data.slots.get_mut(slot.slot) {
            entry.occupant = occupant;
        }
        ctx.put(object);
    }
}

/// Eine zweite Strasse trifft ein eingerastetes Ende: eine Kreuzung übernimmt den Slot.
fn anchor_intersection(
    ctx: &mut BatchContext<'_>,
    anchored: Branch,
    branch: Branch,
) -> Option<ObjectId> {
    let road = ctx.get(anchored.road)?.as_road()?;
    let EndpointLink::Snapped { target, slot } = road.link_at(anchored.knot_index) else {
        return None;
    };
    let center = road.spline.knot(anchored.knot_index)?.position;
    let slot = SlotRef { target, slot };
    let node = new_node(ctx, anchored.road, center, vec![anchored, branch], Some(slot))?;
    set_slot_occupant(ctx, slot, Some(node));
    Some(node)
}

/// Sucht das Teilstück einer (eventuell bereits geteilten) Strasse, auf dem der Punkt liegt.
fn locate_on_road(ctx: &BatchContext<'_>, road_id: ObjectId, point: Vec3) -> Option<(ObjectId, f32)> {
    let root = ctx
        .get(road_id)
        .and_then(SceneObject::as_road)
        .and_then(|r| r.split_original_id)
        .unwrap_or(road_id);

    let mut candidates = vec![road_id];
    candidates.extend(
        ctx.objects()
            .new_objects()
            .filter(|o| o.as_road().is_some_and(|r| r.split_original_id == Some(root)))
            .map(|o| o.id),
    );

    candidates
        .into_iter()
        .filter_map(|id| {
            let hit = ctx.get(id)?.as_road()?.spline.nearest_point(point)?;
            Some((id, hit.t, hit.distance))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(id, t, _)| (id, t))
}

/// Teilt eine Strasse am Punkt und setzt eine Kreuzung mit drei Ästen ein.
pub(crate) fn attach_mid_span(
    ctx: &mut BatchContext<'_>,
    road_id: ObjectId,
    point: Vec3,
    branch: Branch,
) -> Option<Attachment> {
    let (road_id, t) = locate_on_road(ctx, road_id, point)?;
    let object = ctx.cloned(road_id)?;
    let road = object.as_road()?.clone();

    let near_start = road.spline.first_position().distance(point) < END_SNAP_DISTANCE;
    let near_end = road.spline.last_position().distance(point) < END_SNAP_DISTANCE;
    let split = if near_start || near_end {
        None
    } else {
        road.spline.split(t)
    };
    let Some((first, second)) = split else {
        let end = if near_start || t < 0.5 { 0 } else { road.spline.last_index() };
        return attach_at_road_end(ctx, Branch::new(road_id, end), branch);
    };
    let (node, _) = split_road(ctx, &object, first, second)?;
    attach_to_node(ctx, node, branch)?;
    Some(Attachment { node, focus: None })
}

/// Trifft ein neuer Ast ein bestehendes Strassen-Ende, wird dessen Knoten benutzt
/// oder eine neue Kreuzung angelegt.
fn attach_at_road_end(
    ctx: &mut BatchContext<'_>,
    existing: Branch,
    branch: Branch,
) -> Option<Attachment> {
    let road = ctx.get(existing.road)?.as_road()?;
    match road.link_at(existing.knot_index) {
        EndpointLink::Node { id } => attach_to_node(ctx, id, branch).map(|node| Attachment {
            node,
            focus: Some(branch.road),
        }),
        EndpointLink::Snapped { .. } => {
            anchor_intersection(ctx, existing, branch).map(|node| Attachment { node, focus: None })
        }
        EndpointLink::Free => {
            let center = road.spline.knot(existing.knot_index)?.position;
            new_node(ctx, existing.road, center, vec![existing, branch], None).map(|node| {
                Attachment {
                    node,
                    focus: Some(branch.road),
                }
            })
        }
    }
}

/// Teilt eine Strasse in zwei Teilstücke um einen neuen Knoten.
///
/// Das erste Teilstück behält die Id, das zweite erhält eine neue. Beide tragen
/// die Wurzel-Strasse als Herkunft. Rückgabe: (Knoten-Id, Id des zweiten Teils).
pub(crate) fn split_road(
    ctx: &mut BatchContext<'_>,
    object: &SceneObject,
    first: Spline,
    second: Spline,
) -> Option<(ObjectId, ObjectId)> {
    let road = object.as_road()?;
    let root_id = road.split_original_id.unwrap_or(object.id);
    let root_spline = road
        .split_original_spline
        .clone()
        .unwrap_or_else(|| road.spline.clone());
    let old_end = road.end;
    let old_last = road.spline.last_index();

    let node_id = ctx.allocate_id();
    let second_id = ctx.allocate_id();
    let center = first.last_position();
    let first_last = first.last_index();
    let second_last = second.last_index();

    let mut head = object.clone();
    if let Some(data) = head.as_road_mut() {
        data.set_spline(first);
        data.end = EndpointLink::Node { id: node_id };
        data.split_original_id = Some(root_id);
        data.split_original_spline = Some(root_spline.clone());
    }
    ctx.put(head);

    let mut tail_data = RoadData::new(second, road.width);
    tail_data.ramp_road = road.ramp_road;
    tail_data.start = EndpointLink::Node { id: node_id };
    tail_data.end = old_end;
    tail_data.split_original_id = Some(root_id);
    tail_data.split_original_spline = Some(root_spline);
    ctx.put(SceneObject::new(
        second_id,
        object.road.clone(),
        object.elevated,
        ObjectKind::Road(tail_data),
    ));
    relink_end(ctx, old_end, object.id, old_last, second_id, second_last);

    let data = IntersectionData::new(
        center,
        vec![Branch::new(object.id, first_last), Branch::new(second_id, 0)],
    );
    ctx.put(SceneObject::new(
        node_id,
        object.road.clone(),
        object.elevated,
        ObjectKind::Intersection(data),
    ));
    log::debug!("Strasse {} geteilt: {} + {} um Knoten {}", object.id, object.id, second_id, node_id);
    Some((node_id, second_id))
}

/// Ersetzt die Mittellinie einer Strasse und hält den Ast-Index am Ende aktuell.
pub(crate) fn set_road_spline(ctx: &mut BatchContext<'_>, road_id: ObjectId, spline: Spline) {
    let Some(road) = ctx.get(road_id).and_then(SceneObject::as_road) else {
        return;
    };
    let old_last = road.spline.last_index();
    let new_last = spline.last_index();
    let end = road.end;
    ctx.update_road(road_id, |road| road.set_spline(spline));
    if old_last != new_last {
        relink_end(ctx, end, road_id, old_last, road_id, new_last);
    }
}

/// Kürzt einen Ast, bis sein Knoten `need` Meter vom Zentrum entfernt liegt.
pub(crate) fn shorten_branch(
    ctx: &mut BatchContext<'_>,
    knot: &KnotData,
    center: Vec3,
    need: f32,
) -> bool {
    let cut = need - horizontal_distance(center, knot.position);
    if cut <= KNOT_EPSILON {
        return true;
    }
    let Some(road) = ctx.get(knot.road).and_then(SceneObject::as_road) else {
        return false;
    };
    let reduced = if knot.starts_at_center() {
        road.spline.reduce_from_start(cut)
    } else {
        road.spline.reduce_from_end(cut)
    };
    let Some(reduced) = reduced else {
        log::debug!("Ast {} zu kurz für {:.2} m Kürzung", knot.road, cut);
        ctx.fail(ConstructionFail::IntersectionTrackLength);
        return false;
    };
    if reduced.max_slope() > ctx.settings.max_slope {
        ctx.fail(ConstructionFail::IntersectionTrackSlope);
    }
    set_road_spline(ctx, knot.road, reduced);
    true
}

/// Kürzt die Äste einer Kreuzung, damit benachbarte Äste sich nicht berühren.
///
/// Mit `focus` werden nur der Fokus-Ast und Äste gekürzt, deren nächster
/// Winkel-Nachbar der Fokus-Ast ist; ohne `focus` alle Äste.
pub(crate) fn apply_clearance(ctx: &mut BatchContext<'_>, node_id: ObjectId, focus: Option<ObjectId>) {
    let Some(node) = ctx.get(node_id) else {
        return;
    };
    let (center, branches) = match &node.kind {
        ObjectKind::Intersection(data) => (data.center, data.branches.clone()),
        ObjectKind::Roundabout(_) => {
            if let Some(road) = focus {
                trim_to_roundabout(ctx, node_id, road);
            }
            return;
        }
        _ => return,
    };
    if branches.len() < 2 {
        return;
    }

    let knots: Vec<KnotData> = branches
        .iter()
        .filter_map(|b| KnotData::from_branch(&*ctx, *b))
        .collect();
    if !ctx.settings.elevated_intersections && knots.iter().any(|k| k.elevated) {
        ctx.fail(ConstructionFail::ElevatedIntersection);
    }
    let gap = ctx.settings.intersection_distance;

    // Winkel-Nachbarn je Ast
    let neighbours: Vec<Vec<(usize, f32)>> = (0..knots.len())
        .map(|i| {
            let mut others: Vec<(usize, f32)> = (0..knots.len())
                .filter(|j| *j != i)
                .map(|j| (j, angle_between_deg(knots[i].direction, knots[j].direction)))
                .collect();
            others.sort_by(|a, b| a.1.total_cmp(&b.1));
            others
        })
        .collect();

    let is_focus = |i: usize| focus.is_none_or(|road| knots[i].road == road);
    let selected: Vec<usize> = (0..knots.len())
        .filter(|i| is_focus(*i) || neighbours[*i].first().is_some_and(|(j, _)| is_focus(*j)))
        .collect();

    for i in selected {
        let need = neighbours[i]
            .iter()
            .take(2)
            .map(|(j, angle)| get_angle_distance(gap, knots[i].width, knots[*j].width, *angle))
            .fold(0.0, f32::max);
        if !shorten_branch(ctx, &knots[i], center, need) {
            return;
        }
    }
}

/// Kürzt eine Zufahrt bis vor den Aussenrand des Kreisverkehrs.
fn trim_to_roundabout(ctx: &mut BatchContext<'_>, node_id: ObjectId, road_id: ObjectId) {
    let Some(node) = ctx.get(node_id) else {
        return;
    };
    let ObjectKind::Roundabout(data) = &node.kind else {
        return;
    };
    let need = roundabout_clearance(node, data.radius, ctx.settings.intersection_distance);
    let center = data.center;
    let knots: Vec<KnotData> = data
        .branches
        .iter()
        .filter(|b| b.road == road_id)
        .filter_map(|b| KnotData::from_branch(&*ctx, *b))
        .collect();
    for knot in knots {
        shorten_branch(ctx, &knot, center, need);
    }
}

/// Abstand Zentrum → Ast-Knoten an einem Kreisverkehr.
pub(crate) fn roundabout_clearance(node: &SceneObject, radius: f32, gap: f32) -> f32 {
    radius + node.road.drive_width() * 0.5 + node.road.right_side_width() + gap
}

/// Legt eine Kreuzung mit zwei fluchtenden, gleichartigen Ästen zu einer Strasse zusammen.
///
/// Rückgabe: Id der zusammengelegten Strasse.
pub(crate) fn collapse_if_straight(ctx: &mut BatchContext<'_>, node_id: ObjectId) -> Option<ObjectId> {
    let node = ctx.get(node_id)?;
    let ObjectKind::Intersection(data) = &node.kind else {
        return None;
    };
    if data.branches.len() != 2 || data.snap.is_some() || data.branches[0].road == data.branches[1].road {
        return None;
    }
    let a = KnotData::from_branch(&*ctx, data.branches[0])?;
    let b = KnotData::from_branch(&*ctx, data.branches[1])?;
    let angle = angle_between_deg(a.direction, b.direction);
    if angle < 180.0 - ctx.settings.collapse_angle_tolerance || !compatible(&a, &b) {
        return None;
    }
    merge_through_node(ctx, node_id)
}

/// Gleicher Strassentyp und gleiche Ebene.
pub(crate) fn compatible(a: &KnotData, b: &KnotData) -> bool {
    a.descriptor.name == b.descriptor.name && a.elevated == b.elevated
}

/// Ausrichtung eines Teilstücks relativ zum aufgelösten Knoten.
struct Oriented {
    spline: Spline,
    /// Verbindung am knotenfernen Ende
    far: EndpointLink,
    /// Knoten-Index des fernen Endes vor dem Zusammenlegen
    far_index: usize,
}

/// `node_at_start`: Das Teilstück soll am Knoten beginnen (sonst enden).
fn orient(road: &RoadData, knot_index: usize, node_at_start: bool) -> Oriented {
    let last = road.spline.last_index();
    let at_start = knot_index == 0;
    let (spline, far, far_index) = match (at_start, node_at_start) {
        (true, true) => (road.spline.clone(), road.end, last),
        (false, false) => (road.spline.clone(), road.start, 0),
        (true, false) => (road.spline.reversed(), road.end, last),
        (false, true) => (road.spline.reversed(), road.start, 0),
    };
    Oriented {
        spline,
        far,
        far_index,
    }
}

/// Kurve aus der Herkunfts-Strasse zwischen zwei Endpunkten (falls beide darauf liegen).
fn try_merge_splitted(original: &Spline, start: Vec3, end: Vec3) -> Option<Spline> {
    let a = original.nearest_point(start)?;
    let b = original.nearest_point(end)?;
    if a.distance > PROVENANCE_TOLERANCE || b.distance > PROVENANCE_TOLERANCE {
        return None;
    }
    if a.t < b.t {
        original.sub_spline(a.t, b.t)
    } else {
        original.sub_spline(b.t, a.t).map(|s| s.reversed())
    }
}

/// Deckt `spline` die Herkunfts-Kurve von Ende zu Ende ab (in beliebiger Richtung)?
fn spans_whole(original: &Spline, spline: &Spline) -> bool {
    let (a, b) = (spline.first_position(), spline.last_position());
    let (start, end) = (original.first_position(), original.last_position());
    let close = |p: Vec3, q: Vec3| p.distance(q) <= PROVENANCE_TOLERANCE;
    (close(a, start) && close(b, end)) || (close(a, end) && close(b, start))
}

/// Löst einen Knoten mit zwei Ästen auf und legt beide Strassen zusammen.
///
/// Die bestehende Strasse behält ihre Id und Fahrtrichtung; die zweite wird
/// entfernt. Stammen beide aus derselben Wurzel-Strasse, wird deren
/// ursprüngliche Kurve wiederhergestellt.
pub(crate) fn merge_through_node(ctx: &mut BatchContext<'_>, node_id: ObjectId) -> Option<ObjectId> {
    let node = ctx.get(node_id)?;
    let [first, second] = node.branches() else {
        return None;
    };
    let (keep_branch, drop_branch) = if ctx.is_new(first.road) && !ctx.is_new(second.road) {
        (*second, *first)
    } else {
        (*first, *second)
    };
    let keep_object = ctx.cloned(keep_branch.road)?;
    let keep = keep_object.as_road()?.clone();
    let dropped = ctx.get(drop_branch.road)?.as_road()?.clone();
    let keep_last = keep.spline.last_index();

    let node_at_keep_end = keep_branch.knot_index != 0;
    let other = orient(&dropped, drop_branch.knot_index, node_at_keep_end);
    let joined = if node_at_keep_end {
        keep.spline.join(&other.spline)
    } else {
        other.spline.join(&keep.spline)
    };

    let same_root = keep.split_original_id.is_some() && keep.split_original_id == dropped.split_original_id;
    let restored = if same_root {
        keep.split_original_spline
            .as_ref()
            .and_then(|original| try_merge_splitted(original, joined.first_position(), joined.last_position()))
    } else {
        None
    };
    let whole_original = restored.is_some()
        && keep.split_original_spline.as_ref().is_some_and(|original| {
            spans_whole(original, &joined)
        });
    let merged = restored.unwrap_or(joined);
    let merged_last = merged.last_index();

    let mut object = keep_object;
    if let Some(road) = object.as_road_mut() {
        road.set_spline(merged);
        if node_at_keep_end {
            road.end = other.far;
        } else {
            road.start = other.far;
        }
        if !same_root || whole_original {
            road.split_original_id = None;
            road.split_original_spline = None;
        }
    }

    ctx.remove(node_id);
    ctx.remove(drop_branch.road);
    ctx.put(object);

    let far_index = if node_at_keep_end { merged_last } else { 0 };
    relink_end(ctx, other.far, drop_branch.road, other.far_index, keep_branch.road, far_index);
    if !node_at_keep_end && keep_last != merged_last {
        relink_end(ctx, keep.end, keep_branch.road, keep_last, keep_branch.road, merged_last);
    }
    log::debug!(
        "Knoten {} aufgelöst: {} in {} übernommen",
        node_id,
        drop_branch.road,
        keep_branch.road
    );
    Some(keep_branch.road)
}
