//! Use-Cases der Konstruktion.
//!
//! Jeder Use-Case plant eine Operation vollständig gegen das Live-Netz und
//! liefert den ausstehenden Batch samt Fehlschlägen. Übernommen wird erst im
//! Controller (`construct_*`); die `display_*`-Varianten zeigen das identische
//! Ergebnis nur an.

pub mod add_road;
pub mod demolish;
pub mod move_intersection;
pub mod ramp;
pub mod reverse;
pub mod roundabout;

pub use add_road::{plan_road, RoadRequest};
pub use demolish::{plan_demolish, DemolishRequest};
pub use move_intersection::{plan_move_intersection, MoveIntersectionRequest};
pub use ramp::{plan_ramp, RampRequest};
pub use reverse::{plan_reverse, ReverseRequest};
pub use roundabout::{plan_roundabout, RoundaboutRequest};

use indexmap::IndexSet;

use crate::app::construction::{ConstructionFail, ConstructionResult};
use crate::app::graph::{
    apply_clearance, attach_end, collapse_if_straight, Attachment, BatchContext,
};
use crate::app::overlap::Overlap;
use crate::core::{ObjectId, RoadSystem};

/// Objekte, die bei der Überschneidungs-Prüfung übersprungen werden:
/// die Anschluss-Ziele und deren direkte Nachbarn.
pub(crate) fn ignored_near(system: &RoadSystem, targets: impl IntoIterator<Item = ObjectId>) -> IndexSet<ObjectId> {
    let mut ignore = IndexSet::new();
    for id in targets {
        ignore.insert(id);
        ignore.extend(system.connections_of(id));
    }
    ignore
}

/// Ids der Overlap-Ziele.
pub(crate) fn overlap_targets<'a>(overlaps: impl IntoIterator<Item = &'a Overlap>) -> Vec<ObjectId> {
    overlaps.into_iter().filter_map(Overlap::target_id).collect()
}

/// Schliesst beide Enden einer neuen Strasse an und räumt die Knoten auf.
///
/// Rückgabe: Id der Strasse nach eventuellem Zusammenlegen.
pub(crate) fn connect_road_ends(
    ctx: &mut BatchContext<'_>,
    road_id: ObjectId,
    start: Option<&Overlap>,
    end: &Overlap,
) -> ObjectId {
    let last = ctx
        .get(road_id)
        .and_then(|o| o.as_road())
        .map_or(1, |r| r.spline.last_index());

    let mut attachments: Vec<Attachment> = Vec::new();
    if let Some(start) = start {
        attachments.extend(attach_end(ctx, road_id, 0, start));
    }
    attachments.extend(attach_end(ctx, road_id, last, end));

    let mut current = road_id;
    for attachment in attachments {
        if let Some(merged) = collapse_if_straight(ctx, attachment.node) {
            log::debug!("Kreuzung {} aufgelöst, Strasse {} fortgeführt", attachment.node, merged);
            current = merged;
            continue;
        }
        let focus = attachment
            .focus
            .map(|f| if f == road_id { current } else { f });
        apply_clearance(ctx, attachment.node, focus);
    }
    current
}

/// Beendet eine Planung: Geometrie erzeugen, Batch und Fehlschläge übergeben.
pub(crate) fn finish(mut ctx: BatchContext<'_>, extra: Vec<ConstructionFail>) -> ConstructionResult {
    for fail in extra {
        ctx.fail(fail);
    }
    ctx.finalize_geometry();
    let (objects, fails) = ctx.finish();
    ConstructionResult::from_batch(objects, fails)
}
