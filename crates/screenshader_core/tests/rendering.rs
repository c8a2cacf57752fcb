//! Integration tests for the render pipeline, hot reload and parameters

mod support;

use pretty_assertions::assert_eq;
use screenshader_core::{
    Compositor, CompositorError, Geometry, LoopFlags, Viewport, WindowEvent, WindowId,
};
use support::{candidate, MockPlatform, TestFiles, ROOT};

fn compositor(platform: MockPlatform, files: &TestFiles) -> Compositor<MockPlatform> {
    Compositor::new(platform, files.options(), LoopFlags::new()).expect("compositor init")
}

fn curvature(comp: &Compositor<MockPlatform>) -> Option<f32> {
    comp.platform()
        .last_frame()
        .params
        .iter()
        .find(|p| p.name == "u_curvature")
        .map(|p| p.value)
}

#[test]
fn test_frame_draws_bound_windows_bottom_to_top() {
    let files = TestFiles::new("render-order");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(10, 20, 100, 50));
    platform.add_window(4, Geometry::new(0, 0, 800, 600));
    platform.fail_name_pixmap.insert(WindowId(5));
    platform.add_window(5, Geometry::new(0, 0, 5, 5));
    let mut comp = compositor(platform, &files);

    comp.render();

    let frame = comp.platform().last_frame();
    let drawn: Vec<u32> = frame.draws.iter().map(|d| d.window.0).collect();
    assert_eq!(drawn, vec![3, 4]);
    assert_eq!(
        frame.draws[0].viewport,
        Viewport {
            x: 10,
            y: 530,
            width: 100,
            height: 50
        }
    );
    assert_eq!(frame.uniforms.resolution, [800.0, 600.0]);
    assert_eq!(frame.post_program, comp.post_program().program);
}

#[test]
fn test_unmapped_windows_are_not_drawn() {
    let files = TestFiles::new("render-unmapped");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(0, 0, 100, 100));
    platform.add_window(4, Geometry::new(0, 0, 100, 100));
    let mut comp = compositor(platform, &files);

    comp.dispatch(WindowEvent::Unmap {
        window: WindowId(3),
    });
    comp.render();
    let drawn: Vec<u32> = comp
        .platform()
        .last_frame()
        .draws
        .iter()
        .map(|d| d.window.0)
        .collect();
    assert_eq!(drawn, vec![4]);
}

#[test]
fn test_damage_refreshes_texture_once() {
    let files = TestFiles::new("render-damage");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(0, 0, 100, 100));
    let mut comp = compositor(platform, &files);
    let texture = comp.registry().get(WindowId(3)).unwrap().bound.unwrap().texture;

    comp.dispatch(WindowEvent::Damage {
        drawable: WindowId(3),
    });
    comp.render();
    comp.render();

    assert_eq!(comp.platform().refreshed, vec![texture]);
    assert!(!comp.registry().get(WindowId(3)).unwrap().dirty);
}

#[test]
fn test_invalid_reload_keeps_previous_program() {
    let files = TestFiles::new("render-badreload");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    let before = *comp.post_program();

    files.write_shader("#error this does not compile\n");
    assert!(!comp.reload_shader());
    assert_eq!(*comp.post_program(), before);

    comp.render();
    assert_eq!(comp.platform().last_frame().post_program, before.program);
}

#[test]
fn test_link_failure_on_reload_keeps_previous_program() {
    let files = TestFiles::new("render-linkfail");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    let before = *comp.post_program();
    let live_gl = comp.platform().live_gl_objects();

    files.write_shader(&format!("{}uniform float u_extra;\n", support::EFFECT));
    comp.platform_mut().fail_link = true;
    assert!(!comp.reload_shader());
    assert_eq!(*comp.post_program(), before);
    assert_eq!(comp.platform().live_gl_objects(), live_gl);

    comp.render();
    assert_eq!(comp.platform().last_frame().post_program, before.program);
}

#[test]
fn test_reload_request_swaps_program_in_iteration() {
    let files = TestFiles::new("render-reload");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    let before = comp.post_program().program;
    let live_gl = comp.platform().live_gl_objects();

    files.write_shader(&format!("{}uniform float u_extra;\n", support::EFFECT));
    comp.flags().request_reload();
    comp.iterate().unwrap();

    let after = comp.post_program().program;
    assert_ne!(after, before);
    assert_eq!(comp.platform().last_frame().post_program, after);
    assert!(!comp.platform().programs.contains_key(&before));
    assert_eq!(comp.platform().live_gl_objects(), live_gl);
    assert!(!comp.flags().take_reload());
}

#[test]
fn test_root_resize_reallocates_target() {
    let files = TestFiles::new("render-resize");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(0, 100, 200, 200));
    let mut comp = compositor(platform, &files);
    comp.render();
    assert_eq!(comp.platform().target_allocations, 1);

    comp.dispatch(WindowEvent::Configure {
        window: ROOT,
        geometry: Geometry::new(0, 0, 1920, 1080),
        above: None,
    });
    assert_eq!(comp.platform().target_allocations, 2);
    assert_eq!(comp.root_size().width, 1920);

    comp.render();
    let frame = comp.platform().last_frame();
    assert_eq!(frame.uniforms.resolution, [1920.0, 1080.0]);
    assert_eq!(frame.draws[0].viewport.y, 1080 - 100 - 200);

    // Same dimensions again do not reallocate
    comp.dispatch(WindowEvent::Configure {
        window: ROOT,
        geometry: Geometry::new(0, 0, 1920, 1080),
        above: None,
    });
    assert_eq!(comp.platform().target_allocations, 2);
}

#[test]
fn test_failed_target_resize_keeps_old_root_size() {
    let files = TestFiles::new("render-resize-fail");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(0, 100, 200, 200));
    let mut comp = compositor(platform, &files);

    comp.platform_mut().fail_resize = true;
    comp.dispatch(WindowEvent::Configure {
        window: ROOT,
        geometry: Geometry::new(0, 0, 1920, 1080),
        above: None,
    });
    assert_eq!(comp.root_size().width, 800);
    assert_eq!(comp.root_size().height, 600);

    comp.render();
    let frame = comp.platform().last_frame();
    assert_eq!(frame.root.width, 800);
    assert_eq!(frame.uniforms.resolution, [800.0, 600.0]);
    assert_eq!(frame.draws[0].viewport.y, 600 - 100 - 200);

    // A later configure at the same size retries the allocation
    comp.platform_mut().fail_resize = false;
    comp.dispatch(WindowEvent::Configure {
        window: ROOT,
        geometry: Geometry::new(0, 0, 1920, 1080),
        above: None,
    });
    assert_eq!(comp.root_size().width, 1920);
    assert_eq!(comp.platform().target_allocations, 2);
}

#[test]
fn test_parameters_follow_file() {
    let files = TestFiles::new("render-params");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);

    files.write_params("u_curvature 0.2\nu_unused 5\n", 1_000);
    comp.iterate().unwrap();
    assert_eq!(curvature(&comp), Some(0.2));
    let param = comp.params().get("u_curvature").unwrap();
    assert!(param.location.is_some());
    assert_eq!(comp.params().get("u_unused").unwrap().location, None);

    files.write_params("u_unused 5\n", 2_000);
    comp.iterate().unwrap();
    assert_eq!(curvature(&comp), None);
    assert_eq!(comp.params().len(), 1);
}

#[test]
fn test_parameters_survive_reload_with_new_locations() {
    let files = TestFiles::new("render-params-reload");
    files.write_params("u_curvature 0.4\n", 1_000);
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    let before = comp.params().get("u_curvature").unwrap().location;
    assert!(before.is_some());

    // Prepending a line moves every uniform in the mock's numbering
    files.write_shader(&format!("// v2\n{}", support::EFFECT));
    assert!(comp.reload_shader());
    let after = comp.params().get("u_curvature").unwrap().location;
    assert!(after.is_some());
    assert_ne!(after, before);
    assert_eq!(comp.params().get("u_curvature").unwrap().value, 0.4);
}

#[test]
fn test_missing_parameter_file_keeps_current_set() {
    let files = TestFiles::new("render-params-missing");
    files.write_params("u_curvature 0.7\n", 1_000);
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    assert_eq!(comp.params().len(), 1);

    std::fs::remove_file(&files.params).unwrap();
    assert!(!comp.poll_parameters());
    assert_eq!(comp.params().len(), 1);
}

#[test]
fn test_present_failure_does_not_stop_loop() {
    let files = TestFiles::new("render-present");
    let mut platform = MockPlatform::new(800, 600);
    platform.fail_present = true;
    let mut comp = compositor(platform, &files);

    comp.iterate().unwrap();
    comp.iterate().unwrap();
    assert_eq!(comp.platform().frames.len(), 2);
    assert_eq!(comp.platform().waits, 2);
    assert!(comp.needs_redraw());
}

#[test]
fn test_iteration_drains_queued_events() {
    let files = TestFiles::new("render-drain");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    comp.platform_mut().add_window(3, Geometry::new(0, 0, 10, 10));
    comp.platform_mut().add_window(4, Geometry::new(0, 0, 10, 10));
    comp.platform_mut().events.extend([
        WindowEvent::Map {
            window: WindowId(3),
        },
        WindowEvent::Map {
            window: WindowId(4),
        },
    ]);

    comp.iterate().unwrap();
    assert!(comp.platform().events.is_empty());
    assert_eq!(comp.platform().last_frame().draws.len(), 2);
}

#[test]
fn test_run_stops_on_shutdown_flag() {
    let files = TestFiles::new("render-run");
    let flags = LoopFlags::new();
    let mut comp = Compositor::new(MockPlatform::new(800, 600), files.options(), flags.clone())
        .expect("compositor init");

    flags.request_shutdown();
    comp.run().unwrap();
    assert!(comp.platform().frames.is_empty());
}

#[test]
fn test_shutdown_releases_everything() {
    let files = TestFiles::new("render-shutdown");
    let mut platform = MockPlatform::new(800, 600);
    platform.add_window(3, Geometry::new(0, 0, 100, 100));
    platform.add_window(4, Geometry::new(0, 0, 100, 100));
    let mut comp = compositor(platform, &files);
    comp.iterate().unwrap();

    let platform = comp.shutdown();
    assert_eq!(platform.live_bind_resources(), 0);
    assert!(platform.damages.is_empty());
    assert_eq!(platform.live_gl_objects(), 0);
}

#[test]
fn test_init_without_bindable_config_fails() {
    let files = TestFiles::new("render-noconfig");
    let mut platform = MockPlatform::new(800, 600);
    let mut double = candidate(1, 24);
    double.double_buffered = true;
    platform.configs = vec![double];

    let result = Compositor::new(platform, files.options(), LoopFlags::new());
    assert!(matches!(result, Err(CompositorError::NoBindableConfig)));
}

#[test]
fn test_init_with_broken_shader_fails() {
    let files = TestFiles::new("render-badinit");
    files.write_shader("#error nope");
    let result = Compositor::new(MockPlatform::new(800, 600), files.options(), LoopFlags::new());
    assert!(matches!(result, Err(CompositorError::Shader(_))));
}

#[test]
fn test_time_uniform_is_monotonic() {
    let files = TestFiles::new("render-time");
    let mut comp = compositor(MockPlatform::new(800, 600), &files);
    comp.render();
    std::thread::sleep(std::time::Duration::from_millis(5));
    comp.render();

    let frames = &comp.platform().frames;
    assert!(frames[1].uniforms.time > frames[0].uniforms.time);
    assert!(frames[0].uniforms.time >= 0.0);
}

#[test]
fn test_time_counts_from_start_of_initialization() {
    let files = TestFiles::new("render-time-init");
    let mut platform = MockPlatform::new(800, 600);
    platform.init_delay = std::time::Duration::from_millis(20);
    let mut comp = compositor(platform, &files);
    comp.render();

    assert!(comp.platform().frames[0].uniforms.time >= 0.02);
}
