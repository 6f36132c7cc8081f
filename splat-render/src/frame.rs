//! Frame composition — the CPU half of a render.
//!
//! Walks a canvas's layers back to front and turns every visible instance
//! into six interleaved sprite vertices, grouping consecutive quads that
//! share a texture and scissor into one batch.  Live debug rects and lines
//! become untextured overlay triangles.  Nothing here touches the GPU, so
//! the whole traversal is testable headless.

use std::ops::Range;

use glam::Vec3;
use log::{trace, warn};

use splat_core::geometry::map_scissor;
use splat_core::{
    Bounds, CanvasId, DebugLine, DebugRect, FilterMode, Flags, Instance, Point, Rgba, Scene,
    SplatError, SpriteTransform, TextureId,
};

use crate::vertex::{DebugVertex, SpriteVertex, DEPTH_RANGE};

/// Vertex order for the two triangles of a quad given its corners as
/// top-left, top-right, bottom-left, bottom-right.
const QUAD: [usize; 6] = [0, 1, 2, 2, 1, 3];

/// A run of sprite vertices drawn with one texture and one scissor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteBatch {
    pub texture: TextureId,
    /// Top-left-origin `[x, y, w, h]` in offscreen pixels.
    pub scissor: Option<[u32; 4]>,
    pub vertices: Range<u32>,
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Instances emitted as quads.
    pub drawn: u32,
    /// Relative instances outside the view, or clipped to nothing.
    pub culled: u32,
    pub batches: u32,
    /// Debug rects and lines drawn.
    pub overlay: u32,
    /// Debug primitives swept after this frame.
    pub expired: u32,
}

/// Everything the GPU passes need for one canvas.
#[derive(Clone, Debug)]
pub struct Frame {
    pub clear_color: Rgba,
    pub scale: [f32; 2],
    pub filter: FilterMode,
    pub sprites: Vec<SpriteVertex>,
    pub batches: Vec<SpriteBatch>,
    pub overlay: Vec<DebugVertex>,
    /// Clock time the frame was built for.
    pub now: u64,
    pub stats: FrameStats,
}

/// Build the frame for `canvas` at the scene's current time, then sweep
/// the debug primitives that have expired by that time.
pub fn compose(scene: &mut Scene, canvas: CanvasId, viewport: (u32, u32)) -> Result<Frame, SplatError> {
    let now = scene.now_ms();
    let mut frame = build(scene, canvas, viewport, now)?;
    frame.stats.expired = scene.sweep_expired(canvas, now)? as u32;

    trace!(
        "frame @{now}ms: {} drawn, {} culled, {} batches, {} overlay, {} expired",
        frame.stats.drawn,
        frame.stats.culled,
        frame.stats.batches,
        frame.stats.overlay,
        frame.stats.expired
    );
    Ok(frame)
}

/// Build the frame for `canvas` as of `now` without mutating the scene.
///
/// `RELATIVE` instances are culled against the canvas area the viewport
/// shows: the view origin extended by `viewport / scale`, so a zoomed-out
/// canvas keeps the sprites that are still on screen.
pub fn build(
    scene: &Scene,
    canvas: CanvasId,
    viewport: (u32, u32),
    now: u64,
) -> Result<Frame, SplatError> {
    let c = scene.canvas(canvas)?;
    let origin = c.view_origin();
    let [scale_x, scale_y] = c.scale();
    let view = Bounds::new(
        origin.x as f32,
        origin.y as f32,
        viewport.0 as f32 / scale_x,
        viewport.1 as f32 / scale_y,
    );

    let mut frame = Frame {
        clear_color: c.clear_color(),
        scale: c.scale(),
        filter: c.filter(),
        sprites: Vec::new(),
        batches: Vec::new(),
        overlay: Vec::new(),
        now,
        stats: FrameStats::default(),
    };

    // ── Scene pass ──────────────────────────────────────────
    let layers = c.layers().as_slice();
    for (depth, layer_id) in layers.iter().enumerate() {
        let z = (depth as f32).min(DEPTH_RANGE);
        let layer = scene.layer(*layer_id)?;

        for instance_id in layer.instances() {
            let instance = scene.instance(*instance_id)?;
            if !instance.is_visible() {
                continue;
            }

            let placement = instance.placement();
            let relative = instance.flags().contains(Flags::RELATIVE);
            if relative && !placement.intersects(&view) {
                frame.stats.culled += 1;
                continue;
            }

            let scissor = match instance.clip() {
                Some(clip) => {
                    let mapped = map_scissor(clip, c.scale(), viewport.1);
                    match mapped.to_top_left(viewport.0, viewport.1) {
                        Some(rect) => Some(rect),
                        None => {
                            warn!("{instance_id:?}: clip {clip:?} lies outside the target");
                            frame.stats.culled += 1;
                            continue;
                        }
                    }
                }
                None => None,
            };

            let offset = if relative { origin } else { Point::default() };
            let texture = scene.image(instance.image())?.texture();

            let start = frame.sprites.len() as u32;
            push_sprite(&mut frame.sprites, instance, placement, offset, z);
            let end = frame.sprites.len() as u32;
            extend_batches(&mut frame.batches, texture, scissor, start..end);
            frame.stats.drawn += 1;
        }
    }
    frame.stats.batches = frame.batches.len() as u32;

    // ── Debug overlay ───────────────────────────────────────
    let z = (layers.len() as f32).min(DEPTH_RANGE);
    for rect in c.debug().live_rects(now) {
        push_debug_rect(&mut frame.overlay, rect, origin, z);
        frame.stats.overlay += 1;
    }
    for line in c.debug().live_lines(now) {
        push_debug_line(&mut frame.overlay, line, origin, z);
        frame.stats.overlay += 1;
    }

    Ok(frame)
}

fn push_sprite(out: &mut Vec<SpriteVertex>, instance: &Instance, placement: Bounds, offset: Point, z: f32) {
    let (w, h) = (placement.w, placement.h);
    let region = instance.region();
    let color = instance.color();

    let local = [
        (0.0, 0.0, region.s1, region.t1),
        (w, 0.0, region.s2, region.t1),
        (0.0, h, region.s1, region.t2),
        (w, h, region.s2, region.t2),
    ];

    // Skip the matrix entirely when no mirror/rotate bit is set.
    let transform = SpriteTransform::decode(instance.flags(), instance.angle()).map(|t| t.matrix(w, h));

    let x0 = placement.x - offset.x as f32;
    let y0 = placement.y - offset.y as f32;
    let corners = local.map(|(x, y, s, t)| {
        let p = match transform {
            Some(m) => m.transform_point3(Vec3::new(x, y, 0.0)),
            None => Vec3::new(x, y, 0.0),
        };
        SpriteVertex {
            position: [x0 + p.x, y0 + p.y, z],
            tex_coords: [s, t],
            color,
        }
    });

    out.extend(QUAD.iter().map(|&i| corners[i]));
}

fn extend_batches(
    batches: &mut Vec<SpriteBatch>,
    texture: TextureId,
    scissor: Option<[u32; 4]>,
    range: Range<u32>,
) {
    if let Some(last) = batches.last_mut() {
        if last.texture == texture && last.scissor == scissor && last.vertices.end == range.start {
            last.vertices.end = range.end;
            return;
        }
    }
    batches.push(SpriteBatch {
        texture,
        scissor,
        vertices: range,
    });
}

fn push_quad(out: &mut Vec<DebugVertex>, corners: [[f32; 2]; 4], color: Rgba, z: f32) {
    out.extend(QUAD.iter().map(|&i| DebugVertex {
        position: [corners[i][0], corners[i][1], z],
        color,
    }));
}

fn push_box(out: &mut Vec<DebugVertex>, x: f32, y: f32, w: f32, h: f32, color: Rgba, z: f32) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    push_quad(out, [[x, y], [x + w, y], [x, y + h], [x + w, y + h]], color, z);
}

/// `(x, y)` relative to `offset`, in float so extreme view origins cannot
/// overflow.
fn local(x: i32, y: i32, offset: Point) -> (f32, f32) {
    (x as f32 - offset.x as f32, y as f32 - offset.y as f32)
}

fn push_debug_rect(out: &mut Vec<DebugVertex>, rect: &DebugRect, origin: Point, z: f32) {
    let offset = if rect.relative { origin } else { Point::default() };
    let (x, y) = local(rect.rect.x, rect.rect.y, offset);
    let (w, h) = (rect.rect.w as f32, rect.rect.h as f32);
    let t = rect.width as f32;

    // An outline at least as thick as half the rect covers all of it.
    if rect.filled || 2.0 * t >= w || 2.0 * t >= h {
        push_box(out, x, y, w, h, rect.color, z);
        return;
    }

    push_box(out, x, y, w, t, rect.color, z); // top
    push_box(out, x, y + h - t, w, t, rect.color, z); // bottom
    push_box(out, x, y + t, t, h - 2.0 * t, rect.color, z); // left
    push_box(out, x + w - t, y + t, t, h - 2.0 * t, rect.color, z); // right
}

fn push_debug_line(out: &mut Vec<DebugVertex>, line: &DebugLine, origin: Point, z: f32) {
    let offset = if line.relative { origin } else { Point::default() };
    let (x1, y1) = local(line.start.x, line.start.y, offset);
    let (x2, y2) = local(line.end.x, line.end.y, offset);
    let half = line.width as f32 / 2.0;

    let (dx, dy) = (x2 - x1, y2 - y1);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        push_box(out, x1 - half, y1 - half, 2.0 * half, 2.0 * half, line.color, z);
        return;
    }

    // Unit normal scaled to half the width.
    let (nx, ny) = (-dy / len * half, dx / len * half);
    push_quad(
        out,
        [
            [x1 + nx, y1 + ny],
            [x2 + nx, y2 + ny],
            [x1 - nx, y1 - ny],
            [x2 - nx, y2 - ny],
        ],
        line.color,
        z,
    );
}

// ===================================================================
// Tests
// ===================================================================
