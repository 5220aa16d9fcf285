//! Boden-Höhen: Heightmap-Loader, Sampling und das `GroundSampler`-Interface.
//!
//! Die Heightmap erkennt automatisch die Bit-Tiefe (8-Bit oder 16-Bit) und
//! normalisiert die Pixelwerte. Höhe in Metern = `base_height + pixel × height_scale`.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use glam::Vec3;
use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;

/// Liefert die Bodenhöhe an einer horizontalen Position.
///
/// `None`, wenn an der Position kein Boden existiert (außerhalb des Terrains).
pub trait GroundSampler: Send + Sync {
    fn ground_height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Bodenhöhen für viele Punkte (Fork-Join, Reihenfolge bleibt erhalten).
pub fn sample_ground_batch(sampler: &dyn GroundSampler, points: &[Vec3]) -> Vec<Option<f32>> {
    points
        .par_iter()
        .map(|p| sampler.ground_height(p.x, p.z))
        .collect()
}

/// Ebener Boden auf konstanter Höhe, optional begrenzt.
#[derive(Debug, Clone, Copy)]
pub struct FlatGround {
    pub height: f32,
    pub bounds: Option<WorldBounds>,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            bounds: None,
        }
    }

    pub fn bounded(height: f32, bounds: WorldBounds) -> Self {
        Self {
            height,
            bounds: Some(bounds),
        }
    }
}

impl GroundSampler for FlatGround {
    fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        match self.bounds {
            Some(bounds) if !bounds.contains(x, z) => None,
            _ => Some(self.height),
        }
    }
}

/// Weltkoordinaten-Begrenzungen der Heightmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    /// Minimale X-Koordinate (links)
    pub min_x: f32,
    /// Minimale Z-Koordinate (unten)
    pub min_z: f32,
    /// Maximale X-Koordinate (rechts)
    pub max_x: f32,
    /// Maximale Z-Koordinate (oben)
    pub max_z: f32,
}

impl WorldBounds {
    /// Erstellt Bounds aus Map-Größe (zentriert bei 0,0)
    pub fn from_map_size(size: f32) -> Self {
        let half = size / 2.0;
        Self {
            min_x: -half,
            min_z: -half,
            max_x: half,
            max_z: half,
        }
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Rasterisierte Bodenhöhen.
#[derive(Debug, Clone)]
pub struct Heightmap {
    /// Normalisierte Grauwerte [0.0, 1.0], zeilenweise gespeichert
    pixels: Vec<f32>,
    width: u32,
    height: u32,
    world_bounds: WorldBounds,
    /// Meter pro normalisiertem Pixelwert
    height_scale: f32,
    /// Höhe eines schwarzen Pixels
    base_height: f32,
}

impl Heightmap {
    /// Lädt eine Heightmap mit expliziten World-Bounds.
    pub fn load(path: &Path, world_bounds: WorldBounds, height_scale: f32) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Fehler beim Laden der Heightmap: {}", path.display()))?;

        Self::from_image(image, world_bounds, height_scale)
    }

    /// Erstellt eine Heightmap aus einem geladenen Bild.
    fn from_image(image: DynamicImage, world_bounds: WorldBounds, height_scale: f32) -> Result<Self> {
        let (width, height) = image.dimensions();
        anyhow::ensure!(width >= 2 && height >= 2, "Heightmap zu klein: {width}x{height}");

        let bit_depth = match image.color() {
            image::ColorType::L16
            | image::ColorType::La16
            | image::ColorType::Rgb16
            | image::ColorType::Rgba16 => 16u8,
            _ => 8u8,
        };

        let pixels: Vec<f32> = if bit_depth == 16 {
            let luma16 = image.into_luma16();
            luma16.pixels().map(|p| p[0] as f32 / 65535.0).collect()
        } else {
            let luma8 = image.into_luma8();
            luma8.pixels().map(|p| p[0] as f32 / 255.0).collect()
        };

        log::info!(
            "Heightmap geladen: {}x{} Pixel, {}-Bit, Bereich: ({:.1}, {:.1}) bis ({:.1}, {:.1})",
            width,
            height,
            bit_depth,
            world_bounds.min_x,
            world_bounds.min_z,
            world_bounds.max_x,
            world_bounds.max_z
        );

        Ok(Self {
            pixels,
            width,
            height,
            world_bounds,
            height_scale,
            base_height: 0.0,
        })
    }

    /// Erstellt eine Heightmap aus normalisierten Werten (zeilenweise).
    pub fn from_pixels(
        pixels: Vec<f32>,
        width: u32,
        height: u32,
        world_bounds: WorldBounds,
        height_scale: f32,
    ) -> Result<Self> {
        anyhow::ensure!(width >= 2 && height >= 2, "Heightmap zu klein: {width}x{height}");
        anyhow::ensure!(
            pixels.len() == (width * height) as usize,
            "Pixelanzahl {} passt nicht zu {width}x{height}",
            pixels.len()
        );
        Ok(Self {
            pixels,
            width,
            height,
            world_bounds,
            height_scale,
            base_height: 0.0,
        })
    }

    /// Verschiebt die Höhe eines schwarzen Pixels.
    pub fn with_base_height(mut self, base_height: f32) -> Self {
        self.base_height = base_height;
        self
    }

    /// Höhe in Metern an einer Weltposition (bilinear, ohne Bereichsprüfung).
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        let (px, pz) = self.world_to_pixel(x, z);
        let ix = (px.floor() as u32).min(self.width - 2);
        let iz = (pz.floor() as u32).min(self.height - 2);
        let fx = (px - ix as f32).clamp(0.0, 1.0);
        let fz = (pz - iz as f32).clamp(0.0, 1.0);

        let h00 = self.get_grayscale(ix, iz);
        let h10 = self.get_grayscale(ix + 1, iz);
        let h01 = self.get_grayscale(ix, iz + 1);
        let h11 = self.get_grayscale(ix + 1, iz + 1);
        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;

        self.base_height + (top + (bottom - top) * fz) * self.height_scale
    }

    /// Weltposition → kontinuierliche Pixel-Koordinaten (geclampt).
    pub fn world_to_pixel(&self, x: f32, z: f32) -> (f32, f32) {
        let b = &self.world_bounds;
        let nx = ((x - b.min_x) / (b.max_x - b.min_x)).clamp(0.0, 1.0);
        let nz = ((z - b.min_z) / (b.max_z - b.min_z)).clamp(0.0, 1.0);
        (nx * (self.width - 1) as f32, nz * (self.height - 1) as f32)
    }

    /// Pixel-Mittelpunkt → Weltposition (X, Z).
    pub fn pixel_to_world(&self, px: u32, pz: u32) -> (f32, f32) {
        let b = &self.world_bounds;
        (
            b.min_x + (b.max_x - b.min_x) * px as f32 / (self.width - 1) as f32,
            b.min_z + (b.max_z - b.min_z) * pz as f32 / (self.height - 1) as f32,
        )
    }

    /// Holt normalisierten Grauwert eines Pixels (0.0 = schwarz, 1.0 = weiß).
    fn get_grayscale(&self, x: u32, y: u32) -> f32 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Linearer Pixel-Index.
    pub fn pixel_index(&self, px: u32, pz: u32) -> usize {
        (pz * self.width + px) as usize
    }

    /// Höhe eines Pixels in Metern.
    pub fn pixel_height(&self, index: usize) -> f32 {
        self.base_height + self.pixels.get(index).copied().unwrap_or(0.0) * self.height_scale
    }

    /// Setzt die Höhe eines Pixels in Metern; liefert den vorherigen Rohwert.
    pub fn set_pixel_height(&mut self, index: usize, height_m: f32) -> Option<f32> {
        let scale = self.height_scale.max(f32::EPSILON);
        let value = ((height_m - self.base_height) / scale).clamp(0.0, 1.0);
        self.pixels
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Setzt den Rohwert eines Pixels (Undo).
    pub fn restore_pixel(&mut self, index: usize, raw: f32) {
        if let Some(slot) = self.pixels.get_mut(index) {
            *slot = raw;
        }
    }

    /// Gibt die Dimensionen der Heightmap zurück
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Gibt die verwendeten World-Bounds zurück
    pub fn world_bounds(&self) -> &WorldBounds {
        &self.world_bounds
    }
}

impl GroundSampler for Heightmap {
    fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        self.world_bounds
            .contains(x, z)
            .then(|| self.sample_height(x, z))
    }
}

/// Heightmap, die gleichzeitig als Boden abgefragt und vom Terrain-Updater
/// verändert wird.
#[derive(Debug, Clone)]
pub struct SharedHeightmap(pub Arc<RwLock<Heightmap>>);

impl SharedHeightmap {
    pub fn new(map: Heightmap) -> Self {
        Self(Arc::new(RwLock::new(map)))
    }
}

impl GroundSampler for SharedHeightmap {
    fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let map = self.0.read().unwrap_or_else(PoisonError::into_inner);
        map.ground_height(x, z)
    }
}
