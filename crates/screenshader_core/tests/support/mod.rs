//! In-memory platform for driving the compositor without a display
//!
//! Every resource the compositor creates is counted so tests can check that
//! nothing leaks and that bound sets are all-or-nothing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use screenshader_core::{
    BoundResources, CompositeProgram, CompositorError, CompositorOptions, DamageId, DepthConfig,
    EventSource, FbConfigCandidate, FrameUniforms, Geometry, GpuPixmapId, Parameter,
    PixmapBinder, PixmapId, ProgramId, RenderBackend, Result, ShaderBackend, ShaderError,
    ShaderId, ShaderProgram, ShaderStage, Size, TextureId, UniformLocation, WindowAttributes,
    WindowDraw, WindowEvent, WindowId, WindowSystem,
};

pub const ROOT: WindowId = WindowId(1);
pub const OVERLAY: WindowId = WindowId(2);

/// A shader that uses the standard uniforms and one parameter
pub const EFFECT: &str = "uniform sampler2D u_screen;\n\
uniform vec2 u_resolution;\n\
uniform float u_time;\n\
uniform float u_curvature;\n";

/// Everything one frame sent to the render backend
#[derive(Debug, Clone)]
pub struct Frame {
    pub root: Size,
    pub composite_program: ProgramId,
    pub draws: Vec<WindowDraw>,
    pub post_program: ProgramId,
    pub uniforms: FrameUniforms,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    pub root_size: Size,
    pub windows: HashMap<WindowId, WindowAttributes>,
    /// Root children, bottom to top
    pub children: Vec<WindowId>,
    pub configs: Vec<FbConfigCandidate<u32>>,
    pub events: VecDeque<WindowEvent>,

    /// Windows whose pixmap cannot be named
    pub fail_name_pixmap: HashSet<WindowId>,
    /// Windows whose texture allocation fails after the GPU pixmap exists
    pub fail_texture: HashSet<WindowId>,
    /// Windows without damage support
    pub fail_damage: HashSet<WindowId>,
    pub fail_present: bool,
    /// Every link attempt is rejected
    pub fail_link: bool,
    /// Off-screen target allocation fails
    pub fail_resize: bool,
    /// Time spent answering the initial config query
    pub init_delay: Duration,

    next_id: u32,
    pub pixmaps: HashMap<PixmapId, WindowId>,
    pub gpu_pixmaps: HashMap<GpuPixmapId, PixmapId>,
    pub textures: HashMap<TextureId, GpuPixmapId>,
    pub damages: HashMap<DamageId, WindowId>,
    pub subtracted: Vec<DamageId>,
    pub refreshed: Vec<TextureId>,

    pub shaders: HashMap<ShaderId, String>,
    pub programs: HashMap<ProgramId, String>,

    pub target: Option<Size>,
    pub target_allocations: usize,
    pub frames: Vec<Frame>,
    pending: Option<(Size, ProgramId, Vec<WindowDraw>)>,
    pub waits: usize,
}

impl MockPlatform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            root_size: Size::new(width, height),
            configs: vec![candidate(100, 24), candidate(101, 32)],
            ..Default::default()
        }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Create a viewable depth-24 top-level window
    pub fn add_window(&mut self, id: u32, geometry: Geometry) -> WindowId {
        self.add_window_with_depth(id, geometry, 24)
    }

    pub fn add_window_with_depth(&mut self, id: u32, geometry: Geometry, depth: u8) -> WindowId {
        let id = WindowId(id);
        self.windows.insert(
            id,
            WindowAttributes {
                geometry,
                depth,
                override_redirect: false,
                viewable: true,
            },
        );
        self.children.retain(|w| *w != id);
        self.children.push(id);
        id
    }

    pub fn set_viewable(&mut self, id: WindowId, viewable: bool) {
        if let Some(attrs) = self.windows.get_mut(&id) {
            attrs.viewable = viewable;
        }
    }

    pub fn set_geometry(&mut self, id: WindowId, geometry: Geometry) {
        if let Some(attrs) = self.windows.get_mut(&id) {
            attrs.geometry = geometry;
        }
    }

    pub fn live_damage_for(&self, id: WindowId) -> usize {
        self.damages.values().filter(|w| **w == id).count()
    }

    pub fn live_pixmaps_for(&self, id: WindowId) -> usize {
        self.pixmaps.values().filter(|w| **w == id).count()
    }

    /// Total bound resources still alive
    pub fn live_bind_resources(&self) -> usize {
        self.pixmaps.len() + self.gpu_pixmaps.len() + self.textures.len()
    }

    pub fn live_gl_objects(&self) -> usize {
        self.shaders.len() + self.programs.len()
    }

    /// Check a bound set refers to live, correctly chained resources
    pub fn is_live(&self, resources: &BoundResources) -> bool {
        self.textures.get(&resources.texture) == Some(&resources.gpu_pixmap)
            && self.gpu_pixmaps.get(&resources.gpu_pixmap) == Some(&resources.pixmap)
            && self.pixmaps.contains_key(&resources.pixmap)
    }

    pub fn last_frame(&self) -> &Frame {
        self.frames.last().expect("no frame rendered")
    }
}

pub fn candidate(config: u32, depth: u8) -> FbConfigCandidate<u32> {
    FbConfigCandidate {
        config,
        pixmap_drawable: true,
        texture_2d_target: true,
        double_buffered: false,
        bind_rgb: true,
        bind_rgba: depth == 32,
        depth: Some(depth),
    }
}

impl WindowSystem for MockPlatform {
    fn root(&self) -> WindowId {
        ROOT
    }

    fn overlay(&self) -> WindowId {
        OVERLAY
    }

    fn root_size(&self) -> Size {
        self.root_size
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowId>> {
        let mut children = self.children.clone();
        children.push(OVERLAY);
        Ok(children)
    }

    fn attributes(&mut self, window: WindowId) -> Option<WindowAttributes> {
        self.windows.get(&window).copied()
    }

    fn create_damage(&mut self, window: WindowId) -> Result<DamageId> {
        if self.fail_damage.contains(&window) {
            return Err(CompositorError::Protocol("BadMatch".to_string()));
        }
        let damage = DamageId(self.next());
        self.damages.insert(damage, window);
        Ok(damage)
    }

    fn destroy_damage(&mut self, damage: DamageId) {
        assert!(self.damages.remove(&damage).is_some(), "double damage destroy");
    }

    fn subtract_damage(&mut self, damage: DamageId) {
        self.subtracted.push(damage);
    }
}

impl PixmapBinder for MockPlatform {
    type Config = u32;

    fn texture_configs(&mut self) -> Vec<FbConfigCandidate<u32>> {
        if !self.init_delay.is_zero() {
            std::thread::sleep(self.init_delay);
        }
        self.configs.clone()
    }

    fn name_pixmap(&mut self, window: WindowId) -> std::result::Result<PixmapId, String> {
        if self.fail_name_pixmap.contains(&window) {
            return Err("BadMatch".to_string());
        }
        let pixmap = PixmapId(self.next());
        self.pixmaps.insert(pixmap, window);
        Ok(pixmap)
    }

    fn create_gpu_pixmap(
        &mut self,
        pixmap: PixmapId,
        _config: &DepthConfig<u32>,
    ) -> std::result::Result<GpuPixmapId, String> {
        let gpu = GpuPixmapId(u64::from(self.next()));
        self.gpu_pixmaps.insert(gpu, pixmap);
        Ok(gpu)
    }

    fn create_texture(
        &mut self,
        gpu_pixmap: GpuPixmapId,
    ) -> std::result::Result<TextureId, String> {
        let owner = self
            .gpu_pixmaps
            .get(&gpu_pixmap)
            .and_then(|pixmap| self.pixmaps.get(pixmap))
            .copied();
        if owner.is_some_and(|w| self.fail_texture.contains(&w)) {
            return Err("out of memory".to_string());
        }
        let texture = TextureId(self.next());
        self.textures.insert(texture, gpu_pixmap);
        Ok(texture)
    }

    fn refresh_texture(&mut self, resources: &BoundResources) {
        assert!(self.is_live(resources), "refresh of dead resources");
        self.refreshed.push(resources.texture);
    }

    fn release_image(&mut self, resources: &BoundResources) {
        assert!(self.is_live(resources), "release of dead resources");
    }

    fn delete_texture(&mut self, texture: TextureId) {
        assert!(self.textures.remove(&texture).is_some(), "double texture delete");
    }

    fn destroy_gpu_pixmap(&mut self, gpu_pixmap: GpuPixmapId) {
        assert!(
            !self.textures.values().any(|g| *g == gpu_pixmap),
            "GPU pixmap destroyed while its texture is alive"
        );
        assert!(self.gpu_pixmaps.remove(&gpu_pixmap).is_some(), "double GPU pixmap destroy");
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        assert!(
            !self.gpu_pixmaps.values().any(|p| *p == pixmap),
            "pixmap freed while its GPU pixmap is alive"
        );
        assert!(self.pixmaps.remove(&pixmap).is_some(), "double pixmap free");
    }
}

impl ShaderBackend for MockPlatform {
    fn compile(
        &mut self,
        _stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> std::result::Result<ShaderId, ShaderError> {
        if source.contains("#error") {
            return Err(ShaderError::Compile {
                label: label.to_string(),
                log: "0:1(1): error: #error directive".to_string(),
            });
        }
        let shader = ShaderId(self.next());
        self.shaders.insert(shader, source.to_string());
        Ok(shader)
    }

    fn link(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> std::result::Result<ProgramId, ShaderError> {
        assert!(self.shaders.contains_key(&vertex), "link with dead vertex stage");
        if self.fail_link {
            return Err(ShaderError::Link {
                log: "error: unresolved reference to main".to_string(),
            });
        }
        let source = self.shaders[&fragment].clone();
        let program = ProgramId(self.next());
        self.programs.insert(program, source);
        Ok(program)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        assert!(self.shaders.remove(&shader).is_some(), "double shader delete");
    }

    fn delete_program(&mut self, program: ProgramId) {
        assert!(self.programs.remove(&program).is_some(), "double program delete");
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let source = self.programs.get(&program)?;
        let position = source.find(&format!(" {name};"))?;
        Some(UniformLocation(position as i32))
    }
}

impl RenderBackend for MockPlatform {
    fn resize_target(&mut self, size: Size) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Err(CompositorError::RenderTarget("zero-sized target".to_string()));
        }
        if self.fail_resize {
            return Err(CompositorError::RenderTarget("out of memory".to_string()));
        }
        self.target = Some(size);
        self.target_allocations += 1;
        Ok(())
    }

    fn composite_pass(&mut self, root: Size, program: &CompositeProgram, draws: &[WindowDraw]) {
        assert_eq!(self.target, Some(root), "composite into stale target");
        for draw in draws {
            assert!(self.textures.contains_key(&draw.texture), "draw of dead texture");
        }
        self.pending = Some((root, program.program, draws.to_vec()));
    }

    fn post_process_pass(
        &mut self,
        root: Size,
        program: &ShaderProgram,
        uniforms: FrameUniforms,
        params: &[Parameter],
    ) {
        assert!(self.programs.contains_key(&program.program), "dead post program");
        let (composite_root, composite_program, draws) =
            self.pending.take().expect("post-process before composite");
        assert_eq!(composite_root, root);
        self.frames.push(Frame {
            root,
            composite_program,
            draws,
            post_program: program.program,
            uniforms,
            params: params.to_vec(),
        });
    }

    fn present(&mut self) -> Result<()> {
        if self.fail_present {
            return Err(CompositorError::Present("swap failed".to_string()));
        }
        Ok(())
    }
}

impl EventSource for MockPlatform {
    fn next_event(&mut self) -> Result<Option<WindowEvent>> {
        Ok(self.events.pop_front())
    }

    fn wait_for_events(&mut self, _timeout: Duration) {
        self.waits += 1;
    }
}

/// Per-test shader and parameter files in the temp dir
pub struct TestFiles {
    pub shader: PathBuf,
    pub params: PathBuf,
}

impl TestFiles {
    pub fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let files = Self {
            shader: dir.join(format!("screenshader-{tag}-{pid}.frag")),
            params: dir.join(format!("screenshader-{tag}-{pid}.params")),
        };
        let _ = fs::remove_file(&files.params);
        files.write_shader(EFFECT);
        files
    }

    pub fn write_shader(&self, source: &str) {
        fs::write(&self.shader, source).expect("write shader");
    }

    /// Write the parameter file with an explicit modification time
    pub fn write_params(&self, contents: &str, mtime_secs: u64) {
        fs::write(&self.params, contents).expect("write params");
        let file = fs::File::options()
            .write(true)
            .open(&self.params)
            .expect("open params");
        file.set_modified(std::time::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .expect("set mtime");
    }

    pub fn options(&self) -> CompositorOptions {
        CompositorOptions {
            shader_path: self.shader.clone(),
            params_path: self.params.clone(),
            poll_every: 1,
            frame_interval: Duration::from_millis(1),
        }
    }
}

impl Drop for TestFiles {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.shader);
        let _ = fs::remove_file(&self.params);
    }
}
