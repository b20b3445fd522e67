use std::sync::Arc;

use tessera_agents::camera::IsoCamera;
use tessera_agents::render_agent::{FrameView, RenderStrategy, TiledComputeStrategy};
use tessera_core::lane::LaneContext;
use tessera_core::renderer::light::GpuLight;
use tessera_core::renderer::shadow::ShadowSettings;
use tessera_core::renderer::testing::RecordingDevice;
use tessera_core::renderer::tiled::TiledConfig;
use tessera_core::renderer::{
    DebugView, DirectionalLight, Extent3D, FrameTarget, GraphicsDevice, TextureDescriptor,
    TextureFormat, TextureViewDescriptor,
};
use tessera_lanes::render_lane::SharedLayouts;
use tessera_lanes::ShaderLibrary;

fn lane_context(device: &RecordingDevice) -> LaneContext {
    let layouts = SharedLayouts::create(device).unwrap();
    let mut context = LaneContext::new();
    context.insert::<Arc<dyn GraphicsDevice>>(Arc::new(device.clone()));
    context.insert(Arc::new(ShaderLibrary::new(None)));
    context.insert(layouts);
    context.insert(TiledConfig::default());
    context.insert(ShadowSettings::default());
    context
}

fn built_strategy(device: &RecordingDevice, width: u32, height: u32) -> (TiledComputeStrategy, LaneContext) {
    let context = lane_context(device);
    let mut strategy = TiledComputeStrategy::new(TiledConfig::default(), &ShadowSettings::default());
    strategy.handle_resize(width, height).unwrap();
    strategy.build_scene(&context).unwrap();
    (strategy, context)
}

fn frame_view(width: u32, height: u32, time: f32) -> FrameView {
    let mut camera = IsoCamera::new(width, height);
    camera.refresh();
    FrameView {
        view: camera.view(),
        projection: camera.projection(),
        near: camera.near(),
        far: camera.far(),
        width,
        height,
        time,
        debug_view: DebugView::Final,
        sun: DirectionalLight::default(),
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
    FrameTarget {
        color: device
            .create_texture_view(texture, &TextureViewDescriptor::default())
            .unwrap(),
        format: TextureFormat::Bgra8UnormSrgb,
        width,
        height,
    }
}

#[test]
fn test_tile_grid_tracks_resizes() {
    let device = RecordingDevice::default();
    let (mut strategy, context) = built_strategy(&device, 1280, 720);
    let grid = strategy.culler().grid().unwrap();
    assert_eq!((grid.tiles_x, grid.tiles_y), (80, 45));
    assert!(strategy.is_ready());

    let buffers = device.buffer_allocations();
    strategy.handle_resize(1280, 720).unwrap();
    assert_eq!(device.buffer_allocations(), buffers);

    strategy.handle_resize(1920, 1080).unwrap();
    let grid = strategy.culler().grid().unwrap();
    assert_eq!((grid.tiles_x, grid.tiles_y), (120, 68));
    assert!(device.buffer_allocations() > buffers);

    strategy.shutdown(&context);
    assert!(!strategy.is_ready());
}

#[test]
fn test_packed_lights_put_points_before_spots() {
    let device = RecordingDevice::default();
    let (mut strategy, _context) = built_strategy(&device, 640, 360);
    let target = backbuffer(&device, 640, 360);

    let mut encoder = device.create_command_encoder(Some("frame"));
    strategy
        .render_frame(encoder.as_mut(), &frame_view(640, 360, 1.5), &target)
        .unwrap();
    encoder.finish();

    let id = strategy.lights().buffer().buffer().unwrap();
    let record = device.buffer(id).unwrap();
    let lights: Vec<GpuLight> = bytemuck::pod_collect_to_vec(&record.data);
    assert_eq!(lights.len(), 40);
    let first_spot = lights.iter().position(GpuLight::is_spot).unwrap();
    assert_eq!(first_spot, 32);
    assert!(lights[first_spot..].iter().all(GpuLight::is_spot));

    let shadowed: Vec<i32> = lights
        .iter()
        .filter(|light| light.shadow[0] >= 0)
        .map(|light| light.shadow[0])
        .collect();
    assert_eq!(shadowed, [0, 1, 0, 1, 2, 3]);
}
