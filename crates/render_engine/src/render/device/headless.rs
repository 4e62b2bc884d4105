//! Headless recording device
//!
//! Simulates the state machine of a GL context without a GPU: object tables,
//! binding points, shader compile/link, and uniform locations reflected from
//! the GLSL sources. Every draw, uniform lookup, uniform write, clear and
//! release is recorded so tests can assert on exactly what a component did.
//!
//! Deleting a handle that is not live pushes [`DeviceError::InvalidValue`],
//! which makes double releases observable.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use super::reflect;
use super::{
    AttributeFormat, BindingState, BufferHandle, BufferTarget, BufferUsage, ClearFlags,
    DeviceError, GraphicsDevice, PixelFormat, ProgramHandle, SamplerState, ShaderStage,
    StageHandle, TextureHandle, TextureImage, UniformLocation, UniformValue, VertexArrayHandle,
};

new_key_type! {
    struct BufferKey;
    struct ArrayKey;
    struct TextureKey;
    struct StageKey;
    struct ProgramKey;
}

fn key<K: From<KeyData>>(raw: u64) -> K {
    K::from(KeyData::from_ffi(raw))
}

/// Stored buffer contents
#[derive(Debug, Clone)]
pub struct BufferRecord {
    /// Target the buffer was created on
    pub target: BufferTarget,
    /// Usage hint given at creation
    pub usage: BufferUsage,
    /// Uploaded bytes
    pub data: Vec<u8>,
}

/// One attribute slot of a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRecord {
    /// Vertex buffer bound when the pointer was declared
    pub buffer: Option<BufferHandle>,
    /// Declared format
    pub format: AttributeFormat,
}

/// Stored vertex array state
#[derive(Debug, Clone, Default)]
pub struct VertexArrayRecord {
    /// Enabled attribute slots
    pub enabled: BTreeSet<u32>,
    /// Declared attribute pointers by slot
    pub attributes: BTreeMap<u32, AttributeRecord>,
}

/// Stored texture state
#[derive(Debug, Clone, Default)]
pub struct TextureRecord {
    /// Sampler state, once set
    pub sampler: Option<SamplerState>,
    /// Uploaded size and format, once uploaded
    pub image: Option<(u32, u32, PixelFormat)>,
    /// Uploaded pixels
    pub pixels: Vec<u8>,
    /// Whether mipmaps were generated after the upload
    pub mipmapped: bool,
}

#[derive(Debug, Clone)]
struct StageRecord {
    stage: ShaderStage,
    source: String,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ProgramRecord {
    error: Option<String>,
    names: Vec<String>,
    locations: HashMap<String, UniformLocation>,
    values: HashMap<UniformLocation, UniformValue>,
}

/// A recorded indexed draw with the state it consumed
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Program in use
    pub program: Option<ProgramHandle>,
    /// Vertex array bound
    pub vertex_array: VertexArrayHandle,
    /// Index buffer bound
    pub index_buffer: BufferHandle,
    /// Indices drawn
    pub index_count: u32,
    /// Textures attached per unit at draw time
    pub textures: BTreeMap<u32, TextureHandle>,
}

/// A recorded uniform name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLookup {
    /// Program searched
    pub program: ProgramHandle,
    /// Name requested
    pub name: String,
    /// Whether the program declares the name
    pub found: bool,
}

/// A recorded uniform write that reached a valid location
#[derive(Debug, Clone, PartialEq)]
pub struct UniformWrite {
    /// Program in use
    pub program: ProgramHandle,
    /// Name the location resolves back to
    pub name: String,
    /// Value written
    pub value: UniformValue,
}

/// A recorded handle release, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Buffer deleted
    Buffer(BufferHandle),
    /// Vertex array deleted
    VertexArray(VertexArrayHandle),
    /// Texture deleted
    Texture(TextureHandle),
    /// Shader stage deleted
    Stage(StageHandle),
    /// Program deleted
    Program(ProgramHandle),
}

/// Recording device that needs no GPU
#[derive(Default)]
pub struct HeadlessDevice {
    buffers: SlotMap<BufferKey, BufferRecord>,
    arrays: SlotMap<ArrayKey, VertexArrayRecord>,
    textures: SlotMap<TextureKey, TextureRecord>,
    stages: SlotMap<StageKey, StageRecord>,
    programs: SlotMap<ProgramKey, ProgramRecord>,

    bound_vertex_buffer: Option<BufferHandle>,
    bound_index_buffer: Option<BufferHandle>,
    bound_array: Option<VertexArrayHandle>,
    current_program: Option<ProgramHandle>,
    active_unit: u32,
    units: BTreeMap<u32, TextureHandle>,

    clear_color: [f32; 4],
    depth_test: bool,
    viewport: (i32, i32, u32, u32),
    clears: Vec<ClearFlags>,

    errors: VecDeque<DeviceError>,
    draws: Vec<DrawCall>,
    lookups: Vec<UniformLookup>,
    writes: Vec<UniformWrite>,
    releases: Vec<Release>,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next [`GraphicsDevice::poll_error`]
    pub fn inject_error(&mut self, error: DeviceError) {
        self.errors.push_back(error);
    }

    /// Indexed draws issued so far
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Uniform name lookups issued so far
    pub fn uniform_lookups(&self) -> &[UniformLookup] {
        &self.lookups
    }

    /// Uniform writes that reached a location
    pub fn uniform_writes(&self) -> &[UniformWrite] {
        &self.writes
    }

    /// Releases in call order
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Clears issued so far
    pub fn clears(&self) -> &[ClearFlags] {
        &self.clears
    }

    /// Errors not yet polled
    pub fn pending_errors(&self) -> usize {
        self.errors.len()
    }

    /// Forget recorded draws, lookups, writes, clears and releases
    pub fn reset_log(&mut self) {
        self.draws.clear();
        self.lookups.clear();
        self.writes.clear();
        self.clears.clear();
        self.releases.clear();
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live vertex arrays
    pub fn live_vertex_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Number of live textures
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live programs
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of live shader stages
    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    /// Look up a live buffer
    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferRecord> {
        self.buffers.get(key::<BufferKey>(handle.0))
    }

    /// Look up a live vertex array
    pub fn vertex_array(&self, handle: VertexArrayHandle) -> Option<&VertexArrayRecord> {
        self.arrays.get(key::<ArrayKey>(handle.0))
    }

    /// Look up a live texture
    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureRecord> {
        self.textures.get(key::<TextureKey>(handle.0))
    }

    /// Current value stored for a uniform name of a program
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let record = self.programs.get(key::<ProgramKey>(program.0))?;
        let location = record.locations.get(name)?;
        record.values.get(location).copied()
    }

    /// Last clear color set
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Whether depth testing is enabled
    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test
    }

    /// Last viewport set
    pub fn viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    fn fail(&mut self, error: DeviceError, context: &str) {
        log::trace!("HeadlessDevice: {error} ({context})");
        self.errors.push_back(error);
    }

    fn released(&mut self, release: Release, live: bool) {
        if live {
            self.releases.push(release);
        } else {
            self.fail(DeviceError::InvalidValue, "release of a handle that is not live");
        }
    }

    fn bound_texture_mut(&mut self, context: &str) -> Option<&mut TextureRecord> {
        let bound = self
            .units
            .get(&self.active_unit)
            .map(|h| key::<TextureKey>(h.0))
            .filter(|k| self.textures.contains_key(*k));
        let Some(bound) = bound else {
            self.fail(DeviceError::InvalidOperation, context);
            return None;
        };
        self.textures.get_mut(bound)
    }
}

fn compile_diagnostic(source: &str) -> Option<String> {
    if source.trim().is_empty() {
        Some("0(1) : error: empty shader source".to_string())
    } else if !source.contains("main") {
        Some("0(1) : error: missing entry point 'main'".to_string())
    } else {
        None
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) -> BufferHandle {
        let handle = BufferHandle(
            self.buffers
                .insert(BufferRecord { target, usage, data: data.to_vec() })
                .data()
                .as_ffi(),
        );
        self.bind_buffer(target, Some(handle));
        handle
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        if let Some(handle) = buffer {
            if self.buffer(handle).is_none() {
                self.fail(DeviceError::InvalidValue, "bind of unknown buffer");
                return;
            }
        }
        match target {
            BufferTarget::Vertex => self.bound_vertex_buffer = buffer,
            BufferTarget::Index => self.bound_index_buffer = buffer,
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let live = self.buffers.remove(key::<BufferKey>(buffer.0)).is_some();
        if live {
            if self.bound_vertex_buffer == Some(buffer) {
                self.bound_vertex_buffer = None;
            }
            if self.bound_index_buffer == Some(buffer) {
                self.bound_index_buffer = None;
            }
        }
        self.released(Release::Buffer(buffer), live);
    }

    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        VertexArrayHandle(self.arrays.insert(VertexArrayRecord::default()).data().as_ffi())
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayHandle>) {
        if let Some(handle) = array {
            if self.vertex_array(handle).is_none() {
                self.fail(DeviceError::InvalidOperation, "bind of unknown vertex array");
                return;
            }
        }
        self.bound_array = array;
    }

    fn enable_vertex_attribute(&mut self, slot: u32) {
        let Some(handle) = self.bound_array else {
            self.fail(DeviceError::InvalidOperation, "enable attribute without vertex array");
            return;
        };
        if let Some(record) = self.arrays.get_mut(key::<ArrayKey>(handle.0)) {
            record.enabled.insert(slot);
        }
    }

    fn vertex_attribute_pointer(&mut self, slot: u32, format: AttributeFormat) {
        let buffer = self.bound_vertex_buffer;
        let Some(handle) = self.bound_array else {
            self.fail(DeviceError::InvalidOperation, "attribute pointer without vertex array");
            return;
        };
        if !(1..=4).contains(&format.components) {
            self.fail(DeviceError::InvalidValue, "attribute components out of range");
            return;
        }
        if let Some(record) = self.arrays.get_mut(key::<ArrayKey>(handle.0)) {
            record.attributes.insert(slot, AttributeRecord { buffer, format });
        }
    }

    fn delete_vertex_array(&mut self, array: VertexArrayHandle) {
        let live = self.arrays.remove(key::<ArrayKey>(array.0)).is_some();
        if live && self.bound_array == Some(array) {
            self.bound_array = None;
        }
        self.released(Release::VertexArray(array), live);
    }

    fn create_texture(&mut self) -> TextureHandle {
        TextureHandle(self.textures.insert(TextureRecord::default()).data().as_ffi())
    }

    fn set_active_texture_unit(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn active_texture_unit(&mut self) -> u32 {
        self.active_unit
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        match texture {
            Some(handle) if self.texture(handle).is_none() => {
                self.fail(DeviceError::InvalidValue, "bind of unknown texture");
            }
            Some(handle) => {
                self.units.insert(self.active_unit, handle);
            }
            None => {
                self.units.remove(&self.active_unit);
            }
        }
    }

    fn set_sampler_state(&mut self, sampler: &SamplerState) {
        if let Some(record) = self.bound_texture_mut("sampler state without texture") {
            record.sampler = Some(*sampler);
        }
    }

    fn upload_texture_image(&mut self, image: &TextureImage<'_>) {
        let expected = image.width as usize * image.height as usize * usize::from(image.format.channel_count());
        if image.pixels.len() < expected {
            self.fail(DeviceError::InvalidOperation, "texture upload with too few pixels");
            return;
        }
        if let Some(record) = self.bound_texture_mut("texture upload without texture") {
            record.image = Some((image.width, image.height, image.format));
            record.pixels = image.pixels[..expected].to_vec();
            record.mipmapped = false;
        }
    }

    fn generate_mipmaps(&mut self) {
        let missing_image = self
            .units
            .get(&self.active_unit)
            .and_then(|h| self.texture(*h))
            .is_some_and(|record| record.image.is_none());
        if missing_image {
            self.fail(DeviceError::InvalidOperation, "mipmaps for texture without storage");
            return;
        }
        if let Some(record) = self.bound_texture_mut("mipmaps without texture") {
            record.mipmapped = true;
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        let live = self.textures.remove(key::<TextureKey>(texture.0)).is_some();
        if live {
            self.units.retain(|_, bound| *bound != texture);
        }
        self.released(Release::Texture(texture), live);
    }

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> StageHandle {
        let record = StageRecord {
            stage,
            source: source.to_string(),
            error: compile_diagnostic(source),
        };
        StageHandle(self.stages.insert(record).data().as_ffi())
    }

    fn stage_error_log(&mut self, stage: StageHandle) -> Option<String> {
        match self.stages.get(key::<StageKey>(stage.0)) {
            Some(record) => record.error.clone(),
            None => Some("unknown shader stage".to_string()),
        }
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        let live = self.stages.remove(key::<StageKey>(stage.0)).is_some();
        self.released(Release::Stage(stage), live);
    }

    fn link_program(&mut self, stages: &[StageHandle]) -> ProgramHandle {
        let records: Vec<&StageRecord> = stages
            .iter()
            .filter_map(|h| self.stages.get(key::<StageKey>(h.0)))
            .collect();

        let mut error = None;
        for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if !records.iter().any(|r| r.stage == required) {
                error = Some(format!("link error: no {required} shader attached"));
            }
        }
        if let Some(failed) = records.iter().find(|r| r.error.is_some()) {
            error = Some(format!("link error: {} shader did not compile", failed.stage));
        }

        let mut record = ProgramRecord {
            error,
            ..ProgramRecord::default()
        };
        if record.error.is_none() {
            let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
            record.names = reflect::uniform_names(&sources);
            for (index, name) in record.names.iter().enumerate() {
                record.locations.insert(name.clone(), UniformLocation(index as i32));
            }
        }
        ProgramHandle(self.programs.insert(record).data().as_ffi())
    }

    fn program_error_log(&mut self, program: ProgramHandle) -> Option<String> {
        match self.programs.get(key::<ProgramKey>(program.0)) {
            Some(record) => record.error.clone(),
            None => Some("unknown program".to_string()),
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        if let Some(handle) = program {
            let linked = self
                .programs
                .get(key::<ProgramKey>(handle.0))
                .is_some_and(|record| record.error.is_none());
            if !linked {
                self.fail(DeviceError::InvalidOperation, "use of unlinked program");
                return;
            }
        }
        self.current_program = program;
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let live = self.programs.remove(key::<ProgramKey>(program.0)).is_some();
        if live && self.current_program == Some(program) {
            self.current_program = None;
        }
        self.released(Release::Program(program), live);
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let location = self
            .programs
            .get(key::<ProgramKey>(program.0))
            .and_then(|record| record.locations.get(name).copied());
        self.lookups.push(UniformLookup {
            program,
            name: name.to_string(),
            found: location.is_some(),
        });
        location
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let Some(program) = self.current_program else {
            self.fail(DeviceError::InvalidOperation, "uniform write without program");
            return;
        };
        let program_key = key::<ProgramKey>(program.0);
        let name = self.programs.get(program_key).and_then(|record| {
            usize::try_from(location.0)
                .ok()
                .and_then(|i| record.names.get(i))
                .cloned()
        });
        let Some(name) = name else {
            self.fail(DeviceError::InvalidOperation, "uniform location not in program");
            return;
        };
        if let Some(record) = self.programs.get_mut(program_key) {
            record.values.insert(location, *value);
        }
        self.writes.push(UniformWrite {
            program,
            name,
            value: *value,
        });
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.clears.push(flags);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        let (Some(vertex_array), Some(index_buffer)) = (self.bound_array, self.bound_index_buffer) else {
            self.fail(DeviceError::InvalidOperation, "draw without vertex array or index buffer");
            return;
        };
        let available = self.buffer(index_buffer).map_or(0, |b| b.data.len() / 4);
        if index_count as usize > available {
            self.fail(DeviceError::InvalidOperation, "draw reads past the index buffer");
            return;
        }
        self.draws.push(DrawCall {
            program: self.current_program,
            vertex_array,
            index_buffer,
            index_count,
            textures: self.units.clone(),
        });
    }

    fn poll_error(&mut self) -> Option<DeviceError> {
        self.errors.pop_front()
    }

    fn binding_state(&mut self) -> BindingState {
        BindingState {
            vertex_buffer: self.bound_vertex_buffer,
            index_buffer: self.bound_index_buffer,
            vertex_array: self.bound_array,
            program: self.current_program,
            active_unit: self.active_unit,
            textures: self.units.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "headless"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "uniform mat4 model;\nvoid main() {}";
    const FS: &str = "uniform vec3 color;\nvoid main() {}";

    fn linked(device: &mut HeadlessDevice) -> ProgramHandle {
        let vs = device.compile_stage(ShaderStage::Vertex, VS);
        let fs = device.compile_stage(ShaderStage::Fragment, FS);
        device.link_program(&[vs, fs])
    }

    #[test]
    fn test_double_release_is_reported() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferTarget::Vertex, &[0; 16], BufferUsage::Static);
        device.delete_buffer(buffer);
        assert_eq!(device.poll_error(), None);
        device.delete_buffer(buffer);
        assert_eq!(device.poll_error(), Some(DeviceError::InvalidValue));
        assert_eq!(device.releases(), &[Release::Buffer(buffer)]);
    }

    #[test]
    fn test_deleting_bound_buffer_clears_binding() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferTarget::Index, &[0; 12], BufferUsage::Static);
        assert_eq!(device.binding_state().index_buffer, Some(buffer));
        device.delete_buffer(buffer);
        assert!(device.binding_state().is_neutral());
    }

    #[test]
    fn test_compile_and_link_failures() {
        let mut device = HeadlessDevice::new();
        let empty = device.compile_stage(ShaderStage::Vertex, "");
        assert!(device.stage_error_log(empty).is_some());
        let fs = device.compile_stage(ShaderStage::Fragment, FS);
        assert!(device.stage_error_log(fs).is_none());

        let program = device.link_program(&[empty, fs]);
        let log = device.program_error_log(program).unwrap_or_default();
        assert!(log.contains("VERTEX"));
        assert_eq!(device.uniform_location(program, "color"), None);

        device.use_program(Some(program));
        assert_eq!(device.poll_error(), Some(DeviceError::InvalidOperation));
        assert_eq!(device.binding_state().program, None);
    }

    #[test]
    fn test_uniform_round_trip_through_reflection() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);
        device.use_program(Some(program));

        assert_eq!(device.uniform_location(program, "missing"), None);
        let location = device.uniform_location(program, "color").expect("declared uniform");
        device.set_uniform(location, &UniformValue::Vec3([1.0, 0.5, 0.0]));

        assert_eq!(
            device.uniform_value(program, "color"),
            Some(UniformValue::Vec3([1.0, 0.5, 0.0]))
        );
        assert_eq!(device.uniform_writes().len(), 1);
        assert_eq!(device.uniform_lookups().len(), 2);
        assert!(!device.uniform_lookups()[0].found);
    }

    #[test]
    fn test_draw_requires_bound_geometry() {
        let mut device = HeadlessDevice::new();
        device.draw_indexed_triangles(3);
        assert_eq!(device.poll_error(), Some(DeviceError::InvalidOperation));
        assert!(device.draw_calls().is_empty());

        let vao = device.create_vertex_array();
        device.bind_vertex_array(Some(vao));
        let indices: Vec<u8> = [0u32, 1, 2].iter().flat_map(|i| i.to_ne_bytes()).collect();
        let ebo = device.create_buffer(BufferTarget::Index, &indices, BufferUsage::Static);

        device.draw_indexed_triangles(6);
        assert_eq!(device.poll_error(), Some(DeviceError::InvalidOperation));

        device.draw_indexed_triangles(3);
        assert_eq!(device.poll_error(), None);
        let draw = &device.draw_calls()[0];
        assert_eq!((draw.vertex_array, draw.index_buffer, draw.index_count), (vao, ebo, 3));
    }

    #[test]
    fn test_texture_state_follows_active_unit() {
        let mut device = HeadlessDevice::new();
        let texture = device.create_texture();
        device.set_active_texture_unit(2);
        device.bind_texture(Some(texture));
        device.upload_texture_image(&TextureImage {
            width: 1,
            height: 1,
            format: PixelFormat::Rgb8,
            pixels: &[1, 2, 3],
        });
        device.generate_mipmaps();
        let record = device.texture(texture).expect("live texture");
        assert_eq!(record.image, Some((1, 1, PixelFormat::Rgb8)));
        assert!(record.mipmapped);

        device.set_active_texture_unit(0);
        device.generate_mipmaps();
        assert_eq!(device.poll_error(), Some(DeviceError::InvalidOperation));
        assert_eq!(device.binding_state().textures.get(&2), Some(&texture));
    }
}
