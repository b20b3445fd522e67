use std::sync::Arc;

use tessera_agents::camera::{MAX_ZOOM, MIN_ZOOM};
use tessera_agents::{FrameOutcome, InputResponse, RenderAgent};
use tessera_core::config::RendererConfig;
use tessera_core::platform::{InputEvent, MouseButton};
use tessera_core::renderer::frame_graph::RecordedStep;
use tessera_core::renderer::shadow::{MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS, POINT_FACES};
use tessera_core::renderer::testing::RecordingDevice;
use tessera_core::renderer::{
    ApiVersion, DebugView, Extent3D, FrameHazard, FrameSlot, FrameTarget, GpuCapabilities,
    GraphicsDevice, PassList, RenderPath, TextureDescriptor, TextureFormat,
    TextureViewDescriptor,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;

fn caps(major: u32, minor: u32, compute: bool) -> GpuCapabilities {
    GpuCapabilities {
        version: ApiVersion::new(major, minor),
        compute_dispatch: compute,
        memory_barrier: compute,
    }
}

fn backbuffer(device: &RecordingDevice, width: u32, height: u32) -> FrameTarget {
    let texture = device
        .create_texture(&TextureDescriptor::render_target(
            "backbuffer",
            Extent3D::flat(width, height),
            TextureFormat::Bgra8UnormSrgb,
        ))
        .unwrap();
    let color = device
        .create_texture_view(texture, &TextureViewDescriptor::default())
        .unwrap();
    FrameTarget {
        color,
        format: TextureFormat::Bgra8UnormSrgb,
        width,
        height,
    }
}

fn agent_on(device: &RecordingDevice, config: &RendererConfig) -> RenderAgent {
    RenderAgent::new(Arc::new(device.clone()), config, WIDTH, HEIGHT).unwrap()
}

/// Records one frame at `time` and returns the outcome.
fn render(agent: &mut RenderAgent, device: &RecordingDevice, target: &FrameTarget, time: f32) -> FrameOutcome {
    device.clear_commands();
    let mut encoder = device.create_command_encoder(Some("frame"));
    let outcome = agent.render_frame_at(encoder.as_mut(), target, time).unwrap();
    encoder.finish();
    outcome
}

fn rendered(outcome: FrameOutcome) -> PassList {
    match outcome {
        FrameOutcome::Rendered(list) => list,
        FrameOutcome::Skipped => panic!("frame was skipped"),
    }
}

/// Labels with consecutive repeats collapsed and barriers shown as `|`.
fn collapsed_stream(device: &RecordingDevice) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for step in device.pass_stream() {
        let label = match step {
            RecordedStep::Barrier => "|".to_string(),
            RecordedStep::Pass(label) => label,
        };
        if out.last() != Some(&label) || label == "|" {
            out.push(label);
        }
    }
    out
}

fn count_passes(device: &RecordingDevice, name: &str) -> usize {
    device.pass_labels().iter().filter(|label| *label == name).count()
}

#[test]
fn test_full_device_runs_tiled_path_with_barriers() {
    let device = RecordingDevice::default();
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    assert_eq!(agent.path(), RenderPath::TiledCompute);
    assert!(agent.is_ready());

    let list = rendered(render(&mut agent, &device, &target, 0.0));
    assert_eq!(list.validate(&device.pass_stream()), Ok(()));
    assert_eq!(
        collapsed_stream(&device),
        [
            "depth_prepass",
            "shadow_directional",
            "shadow_spot",
            "shadow_point",
            "tile_depth_reduce",
            "|",
            "tile_light_cull",
            "|",
            "tiled_shading",
            "composite",
        ]
    );
}

#[test]
fn test_stream_without_barriers_is_a_hazard() {
    let device = RecordingDevice::default();
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    let list = rendered(render(&mut agent, &device, &target, 0.0));

    let stripped: Vec<RecordedStep> = device
        .pass_stream()
        .into_iter()
        .filter(|step| *step != RecordedStep::Barrier)
        .collect();
    assert_eq!(
        list.validate(&stripped),
        Err(FrameHazard::MissingBarrier {
            pass: "tile_light_cull".to_string(),
            slot: FrameSlot::TileDepthRange,
            writer: "tile_depth_reduce",
        })
    );
}

#[test]
fn test_deferred_path_without_compute() {
    let device = RecordingDevice::new(caps(4, 1, false));
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    assert_eq!(agent.path(), RenderPath::Deferred41);
    let rejections = &agent.decision().unwrap().rejections;
    assert_eq!(rejections[0].0, RenderPath::TiledCompute);

    let list = rendered(render(&mut agent, &device, &target, 0.5));
    assert_eq!(list.validate(&device.pass_stream()), Ok(()));
    assert_eq!(
        collapsed_stream(&device),
        [
            "gbuffer",
            "shadow_directional",
            "shadow_spot",
            "shadow_point",
            "directional_light",
            "light_volumes",
            "composite",
        ]
    );
}

#[test]
fn test_old_device_falls_back_to_simple_forward() {
    let device = RecordingDevice::new(caps(3, 3, false));
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    assert_eq!(agent.path(), RenderPath::SimpleForward);
    assert!(!agent.path().has_dynamic_lights());

    rendered(render(&mut agent, &device, &target, 0.0));
    assert_eq!(device.pass_labels(), ["forward"]);
}

#[test]
fn test_simple_forward_allocates_only_depth() {
    let device = RecordingDevice::new(caps(3, 3, false));
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    rendered(render(&mut agent, &device, &target, 0.0));
    // The backbuffer and the scene depth.
    assert_eq!(device.live_texture_count(), 2);

    agent.resize(WIDTH * 2, HEIGHT * 2).unwrap();
    let target = backbuffer(&device, WIDTH * 2, HEIGHT * 2);
    rendered(render(&mut agent, &device, &target, 0.0));
    assert_eq!(device.live_texture_count(), 3);
}

#[test]
fn test_configured_cap_lowers_the_path() {
    let device = RecordingDevice::default();
    let config = RendererConfig {
        force_path: Some(RenderPath::Deferred41),
        ..RendererConfig::default()
    };
    let agent = agent_on(&device, &config);
    assert_eq!(agent.path(), RenderPath::Deferred41);
}

#[test]
fn test_shadow_casters_are_capped_per_class() {
    let device = RecordingDevice::default();
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let config = RendererConfig::default();
    let mut agent = agent_on(&device, &config);
    for frame in 0..2 {
        render(&mut agent, &device, &target, frame as f32);
        assert_eq!(
            count_passes(&device, "shadow_directional"),
            config.shadows.cascade_count as usize
        );
        assert_eq!(count_passes(&device, "shadow_spot"), MAX_SPOT_SHADOWS);
        assert_eq!(
            count_passes(&device, "shadow_point"),
            MAX_POINT_SHADOWS * POINT_FACES
        );
    }
}

#[test]
fn test_throttled_shadow_class_is_left_out() {
    let device = RecordingDevice::default();
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut config = RendererConfig::default();
    config.shadows.spot_update_every = 2;
    let mut agent = agent_on(&device, &config);

    let first = rendered(render(&mut agent, &device, &target, 0.0));
    assert!(first.find("shadow_spot").is_some());
    let second = rendered(render(&mut agent, &device, &target, 0.1));
    assert!(second.find("shadow_spot").is_none());
    assert_eq!(count_passes(&device, "shadow_spot"), 0);
    assert_eq!(second.validate(&device.pass_stream()), Ok(()));
    let third = rendered(render(&mut agent, &device, &target, 0.2));
    assert!(third.find("shadow_spot").is_some());
}

#[test]
fn test_shadow_shader_failure_keeps_rendering_without_shadows() {
    let device = RecordingDevice::default();
    device.fail_shader("shadow_depth");
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    assert!(agent.is_ready());

    let list = rendered(render(&mut agent, &device, &target, 0.0));
    assert!(device
        .pass_labels()
        .iter()
        .all(|label| !label.starts_with("shadow_")));
    assert_eq!(list.validate(&device.pass_stream()), Ok(()));
}

#[test]
fn test_path_shader_failure_skips_every_frame() {
    let device = RecordingDevice::default();
    device.fail_shader("tiled_shading");
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let mut agent = agent_on(&device, &RendererConfig::default());
    assert!(!agent.is_ready());

    for _ in 0..3 {
        assert_eq!(render(&mut agent, &device, &target, 0.0), FrameOutcome::Skipped);
        assert!(device.pass_stream().is_empty());
    }
    assert_eq!(agent.frame_count(), 0);
}

#[test]
fn test_frame_follows_backbuffer_size() {
    let device = RecordingDevice::default();
    let mut agent = agent_on(&device, &RendererConfig::default());
    let larger = backbuffer(&device, 640, 360);
    rendered(render(&mut agent, &device, &larger, 0.0));
    assert_eq!(agent.camera().viewport(), (640, 360));
}

#[test]
fn test_repeated_resize_allocates_nothing() {
    let device = RecordingDevice::default();
    let mut agent = agent_on(&device, &RendererConfig::default());
    let textures = device.texture_allocations();
    let buffers = device.buffer_allocations();

    agent.resize(WIDTH, HEIGHT).unwrap();
    agent.resize(WIDTH, HEIGHT).unwrap();
    agent.resize(0, 0).unwrap();
    assert_eq!(device.texture_allocations(), textures);
    assert_eq!(device.buffer_allocations(), buffers);

    agent.resize(WIDTH * 2, HEIGHT * 2).unwrap();
    assert!(device.texture_allocations() > textures);
    assert!(device.buffer_allocations() > buffers);
    assert_eq!(agent.camera().viewport(), (WIDTH * 2, HEIGHT * 2));
}

#[test]
fn test_wheel_zoom_saturates() {
    let device = RecordingDevice::default();
    let mut agent = agent_on(&device, &RendererConfig::default());
    let wheel = |delta_y| InputEvent::MouseWheelScrolled {
        delta_x: 0.0,
        delta_y,
    };
    for _ in 0..40 {
        agent.handle_input(&wheel(-1.0));
    }
    assert_eq!(agent.camera().zoom(), MAX_ZOOM);
    for _ in 0..80 {
        agent.handle_input(&wheel(1.0));
    }
    assert_eq!(agent.camera().zoom(), MIN_ZOOM);
}

#[test]
fn test_middle_drag_pans_only_while_held() {
    let device = RecordingDevice::default();
    let mut agent = agent_on(&device, &RendererConfig::default());
    let moved = |x, y| InputEvent::MouseMoved { x, y };

    agent.handle_input(&moved(100.0, 100.0));
    agent.handle_input(&moved(150.0, 100.0));
    assert_eq!(agent.camera().pan().x, 0.0);

    agent.handle_input(&InputEvent::MouseButtonPressed {
        button: MouseButton::Middle,
    });
    agent.handle_input(&moved(160.0, 120.0));
    let pan = agent.camera().pan();
    approx::assert_abs_diff_eq!(pan.x, -0.1, epsilon = 1e-6);
    approx::assert_abs_diff_eq!(pan.y, 0.2, epsilon = 1e-6);

    agent.handle_input(&InputEvent::MouseButtonReleased {
        button: MouseButton::Middle,
    });
    agent.handle_input(&moved(400.0, 400.0));
    assert_eq!(agent.camera().pan(), pan);
}

#[test]
fn test_keys_select_debug_view_and_quit() {
    let device = RecordingDevice::default();
    let mut agent = agent_on(&device, &RendererConfig::default());
    let press = |code: &str| InputEvent::KeyPressed {
        key_code: code.to_string(),
    };

    assert_eq!(agent.handle_input(&press("Digit6")), InputResponse::Continue);
    assert_eq!(agent.debug_view(), DebugView::LightOverlap);
    agent.handle_input(&press("Numpad0"));
    assert_eq!(agent.debug_view(), DebugView::Final);
    agent.handle_input(&press("Digit9"));
    assert_eq!(agent.debug_view(), DebugView::Final);
    assert_eq!(agent.handle_input(&press("Escape")), InputResponse::Quit);
}

#[test]
fn test_shutdown_releases_every_resource() {
    let device = RecordingDevice::default();
    let target = backbuffer(&device, WIDTH, HEIGHT);
    let baseline = device.live_resource_count();

    let mut agent = agent_on(&device, &RendererConfig::default());
    rendered(render(&mut agent, &device, &target, 0.0));
    agent.shutdown();
    agent.shutdown();
    assert_eq!(device.live_resource_count(), baseline);
    assert!(!agent.is_ready());
    assert_eq!(render(&mut agent, &device, &target, 0.0), FrameOutcome::Skipped);
}
