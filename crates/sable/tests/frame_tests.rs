//! End-to-end frame tests through the headless renderer (no GPU required).
//!
//! These drive the full path: recording, flattening, expansion, batching and
//! replay, then assert on the draw-event stream the backend would execute.

use sable::headless::DrawEvent;
use sable::{
    CallKind, Color, Context, DynCaps, HeadlessRenderer, ImageFlags, Paint, RendererFeatures,
    TextureKind, Vec2,
};

fn new_ctx() -> Context<HeadlessRenderer> {
    let mut ctx = Context::new(HeadlessRenderer::new());
    ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
    ctx
}

fn star(ctx: &mut Context<HeadlessRenderer>) {
    ctx.begin_path();
    let c = Vec2::new(100.0, 100.0);
    for i in 0..10 {
        let r = if i % 2 == 0 { 60.0 } else { 25.0 };
        let a = i as f32 / 10.0 * std::f32::consts::TAU;
        let p = c + Vec2::new(a.cos(), a.sin()) * r;
        if i == 0 {
            ctx.move_to(p);
        } else {
            ctx.line_to(p);
        }
    }
    ctx.close_path();
}

#[test]
fn test_convex_fill_draws_interior_then_fringe() {
    let mut ctx = new_ctx();
    ctx.begin_path();
    ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
    ctx.fill();
    ctx.end_frame();

    let events: Vec<DrawEvent> = ctx.renderer().events().to_vec();
    assert_eq!(events.len(), 2);
    // Fan converted to a triangle list: 4 corners make 2 triangles.
    assert_eq!(events[0].vertex_count, 6);
    // Fringe ring strip: a vertex pair per corner plus the closing pair.
    assert_eq!(events[1].vertex_count, 10);
    assert!(events.iter().all(|e| e.color_write));
    assert!(events.iter().all(|e| e.uniform_offset == 0));
    assert_ne!(events[0].pipeline, events[1].pipeline);
}

#[test]
fn test_triangle_fill_is_one_convex_call() {
    let mut ctx = new_ctx();
    ctx.begin_path();
    ctx.move_to(Vec2::new(100.0, 100.0));
    ctx.line_to(Vec2::new(200.0, 100.0));
    ctx.line_to(Vec2::new(150.0, 200.0));
    ctx.close_path();
    ctx.set_fill_color(Color::rgbf(1.0, 0.0, 0.0));
    ctx.fill();
    ctx.end_frame();

    let snap = ctx.renderer().last_frame().unwrap();
    assert_eq!(snap.calls.len(), 1);
    let call = snap.calls[0];
    assert_eq!(call.kind, CallKind::ConvexFill);
    assert_eq!(call.path_count, 1);
    // Three corners make a single listed triangle.
    let path = &snap.paths[call.path_offset as usize];
    assert_eq!(path.fill.count, 3);
    // One paint block serves both the interior and the fringe.
    assert_eq!(snap.uniforms.len(), 1);
    assert_eq!(call.uniform_offset, 0);
    assert_eq!(snap.uniforms[0].inner_color.to_array(), [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_concave_fill_uses_stencil_then_cover() {
    let mut ctx = new_ctx();
    star(&mut ctx);
    ctx.fill();
    ctx.end_frame();

    let events = ctx.renderer().events();
    assert_eq!(events.len(), 3);
    // Phase 1 only touches the stencil buffer.
    assert!(!events[0].color_write);
    assert!(events[1].color_write);
    // Phase 3 covers the bounds with a quad.
    assert_eq!(events[2].vertex_count, 4);
    assert_eq!(events[0].uniform_offset, 0);
    assert_eq!(events[1].uniform_offset, 1);
    assert_eq!(events[2].uniform_offset, 1);
    assert_eq!(ctx.renderer().pipeline_count(), 3);
}

#[test]
fn test_fill_stencil_covers_overlap_union_once() {
    fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
    }
    fn inside(t: [Vec2; 3], p: Vec2) -> bool {
        let e0 = edge(t[0], t[1], p);
        let e1 = edge(t[1], t[2], p);
        let e2 = edge(t[2], t[0], p);
        (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
    }

    // Two overlapping squares filled in one go take the stencil path. The
    // replayed increment/decrement and cover rules on a pixel grid must
    // color the union exactly once: the winding-2 overlap is neither a hole
    // nor double-covered.
    let mut ctx = new_ctx();
    ctx.begin_path();
    ctx.rect(Vec2::new(60.0, 60.0), Vec2::new(80.0, 80.0));
    ctx.rect(Vec2::new(100.0, 100.0), Vec2::new(80.0, 80.0));
    ctx.fill();
    ctx.end_frame();

    let snap = ctx.renderer().last_frame().unwrap();
    let call = snap.calls[0];
    assert_eq!(call.kind, CallKind::Fill);
    let paths = &snap.paths[call.path_offset as usize..][..call.path_count as usize];
    assert_eq!(paths.len(), 2);

    let (w, h) = (240usize, 240usize);
    let idx = |x: usize, y: usize| y * w + x;
    let mut stencil = vec![0u8; w * h];
    for path in paths {
        let verts = &snap.vertices[path.fill.offset as usize..][..path.fill.count as usize];
        for tri in verts.chunks_exact(3) {
            let t = [tri[0].pos, tri[1].pos, tri[2].pos];
            let orient = edge(t[0], t[1], t[2]);
            if orient == 0.0 {
                continue;
            }
            for y in 0..h {
                for x in 0..w {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    if inside(t, p) {
                        let s = &mut stencil[idx(x, y)];
                        *s = if orient > 0.0 {
                            s.wrapping_add(1)
                        } else {
                            s.wrapping_sub(1)
                        };
                    }
                }
            }
        }
    }

    // Winding magnitude 2 in the overlap, 1 in the single squares, 0 out.
    // Probes stay off the fan diagonals, where the closed point-in-triangle
    // test counts a sample for both adjacent triangles.
    assert!(matches!(stencil[idx(130, 110)], 2 | 254));
    assert!(matches!(stencil[idx(70, 90)], 1 | 255));
    assert_eq!(stencil[idx(30, 50)], 0);

    let quad = &snap.vertices[call.triangle_offset as usize..][..call.triangle_count as usize];
    assert_eq!(quad.len(), 4);
    let min = quad.iter().fold(Vec2::splat(f32::MAX), |m, v| m.min(v.pos));
    let max = quad.iter().fold(Vec2::splat(f32::MIN), |m, v| m.max(v.pos));

    let mut colored = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let i = idx(x, y);
            if stencil[i] != 0 {
                // Anything the stencil marked must sit under the cover quad.
                assert!(p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y);
                colored[i] = true;
                stencil[i] = 0;
            }
        }
    }
    assert!(colored[idx(130, 110)]);
    assert!(colored[idx(70, 90)]);
    assert!(!colored[idx(150, 80)]);
    // Two 80x80 squares sharing a 40x40 corner, shrunk by the half-fringe
    // inset; exact edge pixels may land either way.
    let area = colored.iter().filter(|&&c| c).count();
    assert!((10_000..12_000).contains(&area), "union area {area}");
}

#[test]
fn test_stencil_stroke_three_passes() {
    let mut ctx = new_ctx();
    ctx.begin_path();
    ctx.circle(Vec2::new(200.0, 200.0), 50.0);
    ctx.set_stroke_width(8.0);
    ctx.stroke();
    ctx.end_frame();

    let events = ctx.renderer().events();
    assert_eq!(events.len(), 3);
    // Base and AA passes draw color; the stencil clear does not.
    assert!(events[0].color_write);
    assert!(events[1].color_write);
    assert!(!events[2].color_write);
    assert_eq!(events[0].uniform_offset, 1);
    assert_eq!(events[1].uniform_offset, 0);
    assert_eq!(events[2].uniform_offset, 0);
    // All three passes replay the same strip.
    assert_eq!(events[0].vertex_offset, events[1].vertex_offset);
    assert_eq!(events[0].vertex_count, events[2].vertex_count);
}

#[test]
fn test_plain_stroke_without_stencil_support() {
    let features = RendererFeatures {
        edge_antialias: true,
        stencil_strokes: false,
    };
    let mut ctx = Context::new(HeadlessRenderer::with_features(features, DynCaps::empty()));
    ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
    ctx.begin_path();
    ctx.move_to(Vec2::new(10.0, 10.0));
    ctx.line_to(Vec2::new(200.0, 10.0));
    ctx.set_stroke_width(4.0);
    ctx.stroke();
    ctx.end_frame();

    let events = ctx.renderer().events();
    assert_eq!(events.len(), 1);
    assert!(events[0].color_write);
    assert_eq!(events[0].uniform_offset, 0);
}

#[test]
fn test_aliased_renderer_skips_fringe() {
    let features = RendererFeatures {
        edge_antialias: false,
        stencil_strokes: true,
    };
    let mut ctx = Context::new(HeadlessRenderer::with_features(features, DynCaps::empty()));
    ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
    ctx.begin_path();
    ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
    ctx.fill();
    ctx.end_frame();

    // Interior only, no fringe strip.
    let events = ctx.renderer().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].vertex_count, 6);
}

#[test]
fn test_pipeline_cache_stops_growing() {
    let mut ctx = new_ctx();
    for frame in 0..3 {
        if frame > 0 {
            ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        }
        ctx.begin_path();
        ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
        ctx.fill();
        star(&mut ctx);
        ctx.fill();
        ctx.begin_path();
        ctx.circle(Vec2::new(300.0, 300.0), 40.0);
        ctx.stroke();
        ctx.end_frame();
    }

    assert_eq!(ctx.renderer().frames_flushed(), 3);
    // Convex pair + three fill phases + three stroke passes, shared across
    // frames.
    assert_eq!(ctx.renderer().pipeline_count(), 8);
}

#[test]
fn test_dynamic_caps_collapse_pipelines() {
    let scene = |ctx: &mut Context<HeadlessRenderer>| {
        ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        ctx.begin_path();
        ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
        ctx.fill();
        ctx.begin_path();
        ctx.circle(Vec2::new(300.0, 300.0), 40.0);
        ctx.stroke();
        ctx.end_frame();
    };

    let mut fixed = Context::new(HeadlessRenderer::new());
    scene(&mut fixed);
    let mut dynamic = Context::new(HeadlessRenderer::with_features(
        RendererFeatures {
            edge_antialias: true,
            stencil_strokes: true,
        },
        DynCaps::all(),
    ));
    scene(&mut dynamic);

    // With every group dynamic, one pipeline serves the whole scene.
    assert!(fixed.renderer().pipeline_count() > 1);
    assert_eq!(dynamic.renderer().pipeline_count(), 1);
}

#[test]
fn test_image_paint_reaches_draws() {
    let mut ctx = new_ctx();
    let img = ctx
        .create_image(TextureKind::Rgba, 8, 8, ImageFlags::empty(), None)
        .unwrap();
    let paint = Paint::image_pattern(Vec2::ZERO, Vec2::new(8.0, 8.0), 0.0, img, 1.0);
    ctx.set_fill_paint(paint);
    ctx.begin_path();
    ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
    ctx.fill();
    ctx.end_frame();

    let events = ctx.renderer().events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.image == Some(img)));
}

#[test]
fn test_deleted_image_falls_back_to_gradient() {
    let mut ctx = new_ctx();
    let img = ctx
        .create_image(TextureKind::Rgba, 8, 8, ImageFlags::empty(), None)
        .unwrap();
    let paint = Paint::image_pattern(Vec2::ZERO, Vec2::new(8.0, 8.0), 0.0, img, 1.0);
    ctx.delete_image(img).unwrap();

    ctx.set_fill_paint(paint);
    ctx.begin_path();
    ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
    ctx.fill();
    ctx.end_frame();

    // The draw still lands; the stale id simply rides along for the backend
    // to ignore.
    assert!(!ctx.renderer().events().is_empty());
}

#[test]
fn test_scissored_scene_under_save_restore() {
    let mut ctx = new_ctx();
    ctx.save();
    ctx.translate(Vec2::new(100.0, 100.0));
    ctx.scissor(Vec2::ZERO, Vec2::new(50.0, 50.0));
    ctx.begin_path();
    ctx.rect(Vec2::new(-10.0, -10.0), Vec2::new(70.0, 70.0));
    ctx.set_fill_color(Color::rgbaf(1.0, 0.5, 0.0, 1.0));
    ctx.fill();
    ctx.restore();

    ctx.begin_path();
    ctx.rect(Vec2::new(500.0, 10.0), Vec2::new(40.0, 40.0));
    ctx.fill();
    ctx.end_frame();

    // Both fills end up in the frame; scissoring is per-draw state, not a
    // geometry filter.
    assert_eq!(ctx.renderer().events().len(), 4);
}

#[test]
fn test_empty_path_draws_nothing() {
    let mut ctx = new_ctx();
    ctx.begin_path();
    ctx.fill();
    ctx.begin_path();
    ctx.move_to(Vec2::new(10.0, 10.0));
    ctx.stroke();
    ctx.end_frame();

    assert_eq!(ctx.renderer().frames_flushed(), 1);
    assert!(ctx.renderer().events().is_empty());
}

#[test]
fn test_texture_upload_roundtrip() {
    let mut ctx = new_ctx();
    let data: Vec<u8> = (0..16u8).collect();
    let img = ctx
        .create_image(TextureKind::Alpha, 4, 4, ImageFlags::empty(), Some(&data))
        .unwrap();
    assert_eq!(ctx.renderer().texture_data(img), Some(data.as_slice()));

    let update: Vec<u8> = vec![0xff; 16];
    ctx.update_image(img, &update).unwrap();
    assert_eq!(ctx.renderer().texture_data(img), Some(update.as_slice()));
}
