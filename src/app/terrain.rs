//! Terrain-Kollaborator: passt den Boden beim Commit an die Fahrbahn an.
//!
//! Der Kern liefert nur Kurve, Breite und Einstellungen. Die mitgelieferte
//! Umsetzung [`HeightmapTerrain`] ebnet den Fussabdruck einer Strasse in einer
//! geteilten Heightmap ein und merkt sich die ursprünglichen Pixel für Undo.

use std::sync::PoisonError;

use glam::{Vec2, Vec3};
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::core::{Aabb, SharedHeightmap, Spline};
use crate::shared::TerrainSettings;

/// Abtastabstand der Fahrbahnmitte für den Fussabdruck (Meter).
const FOOTPRINT_STEP: f32 = 0.5;

/// Ursprüngliche Rohwerte aller Pixel, die ein Commit verändert hat.
///
/// Der erste Schreibzugriff pro Pixel gewinnt; spätere Änderungen im selben
/// Commit überschreiben den gemerkten Wert nicht.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainUndoCache {
    pub pixels: IndexMap<usize, f32>,
}

impl TerrainUndoCache {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    fn remember(&mut self, index: usize, raw: f32) {
        self.pixels.entry(index).or_insert(raw);
    }
}

/// Schnittstelle zum Terrain des Hosts.
pub trait TerrainUpdater: Send {
    /// Passt das Terrain an den Fussabdruck einer Kurve an.
    ///
    /// `check_height`: nur abtragen, niemals aufschütten.
    /// `reset`: der Undo-Cache beginnt von vorn (erster Fussabdruck eines Commits).
    fn update_terrain(
        &mut self,
        settings: &TerrainSettings,
        spline: &Spline,
        width: f32,
        check_height: bool,
        reset: bool,
        undo_cache: &mut TerrainUndoCache,
    );

    /// Stellt alle im Cache gemerkten Pixel wieder her.
    fn restore(&mut self, undo_cache: &TerrainUndoCache);
}

/// Terrain-Anpassung auf einer geteilten Heightmap.
#[derive(Debug, Clone)]
pub struct HeightmapTerrain {
    map: SharedHeightmap,
}

impl HeightmapTerrain {
    pub fn new(map: SharedHeightmap) -> Self {
        Self { map }
    }
}

/// Horizontaler Abstand zur Mittellinie und Fahrbahnhöhe an dieser Stelle.
fn nearest_on_polyline(points: &[Vec3], x: f32, z: f32) -> Option<(f32, f32)> {
    let query = Vec2::new(x, z);
    points
        .windows(2)
        .map(|w| {
            let a = Vec2::new(w[0].x, w[0].z);
            let b = Vec2::new(w[1].x, w[1].z);
            let ab = b - a;
            let len_sq = ab.length_squared();
            let s = if len_sq > f32::EPSILON {
                ((query - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = a + ab * s;
            (closest.distance(query), w[0].y + (w[1].y - w[0].y) * s)
        })
        .min_by(|l, r| l.0.total_cmp(&r.0))
}

impl TerrainUpdater for HeightmapTerrain {
    fn update_terrain(
        &mut self,
        settings: &TerrainSettings,
        spline: &Spline,
        width: f32,
        check_height: bool,
        reset: bool,
        undo_cache: &mut TerrainUndoCache,
    ) {
        if reset {
            undo_cache.clear();
        }
        let samples = ((spline.length() / FOOTPRINT_STEP).ceil() as usize).max(1);
        let centerline = spline.sample_points(samples);
        let half = width * 0.5;
        let reach = half + settings.falloff;
        let area = Aabb::from_points(&centerline).expanded(reach);
        if area.is_empty() {
            return;
        }

        let mut map = self.map.0.write().unwrap_or_else(PoisonError::into_inner);
        let (w, h) = map.dimensions();
        let (min_px, min_pz) = map.world_to_pixel(area.min.x, area.min.z);
        let (max_px, max_pz) = map.world_to_pixel(area.max.x, area.max.z);
        let (x0, x1) = (min_px.floor() as u32, (max_px.ceil() as u32).min(w - 1));
        let (z0, z1) = (min_pz.floor() as u32, (max_pz.ceil() as u32).min(h - 1));

        let pixels: Vec<(u32, u32)> = (z0..=z1).flat_map(|pz| (x0..=x1).map(move |px| (px, pz))).collect();
        let reader = &*map;
        let updates: Vec<(usize, f32)> = pixels
            .par_iter()
            .filter_map(|&(px, pz)| {
                let (x, z) = reader.pixel_to_world(px, pz);
                let (distance, road_y) = nearest_on_polyline(&centerline, x, z)?;
                if distance > reach {
                    return None;
                }
                let index = reader.pixel_index(px, pz);
                let current = reader.pixel_height(index);
                let surface = road_y - settings.height_offset;
                let target = if distance <= half || settings.falloff <= f32::EPSILON {
                    surface
                } else {
                    let blend = (distance - half) / settings.falloff;
                    surface + (current - surface) * blend
                };
                if check_height && target >= current {
                    return None;
                }
                ((target - current).abs() > f32::EPSILON).then_some((index, target))
            })
            .collect();

        log::debug!("Terrain: {} Pixel angepasst", updates.len());
        for (index, height) in updates {
            if let Some(previous) = map.set_pixel_height(index, height) {
                undo_cache.remember(index, previous);
            }
        }
    }

    fn restore(&mut self, undo_cache: &TerrainUndoCache) {
        let mut map = self.map.0.write().unwrap_or_else(PoisonError::into_inner);
        for (index, raw) in &undo_cache.pixels {
            map.restore_pixel(*index, *raw);
        }
        log::debug!("Terrain: {} Pixel wiederhergestellt", undo_cache.pixels.len());
    }
}
