// Copyright @yucwang 2026

pub mod messages;

use crate::capture::bridge::{ DataBridge, SampleSink };
use crate::capture::path_data::PathSample;
use crate::core::cancel::CancelToken;
use crate::core::interface::RenderInterface;
use crate::core::plugin::{ Plugin, PluginRegistry };
use crate::wire::stream::{ WireError, WireReader, WireWriter };

use log::{ info, warn };
use parking_lot::Mutex;

use std::io::ErrorKind;
use std::net::{ TcpListener, TcpStream };
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 50013 }
    }
}

/// Buffers path samples committed by the capture bridge until the client
/// drains them.
#[derive(Default)]
pub struct SampleLog {
    samples: Mutex<Vec<PathSample>>,
}

impl SampleLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn drain(&self) -> Vec<PathSample> {
        self.samples.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

impl SampleSink for SampleLog {
    fn push(&self, sample: PathSample) {
        self.samples.lock().push(sample);
    }
}

enum ClientExit {
    Disconnect,
    Quit,
}

/// Serves one debugging client at a time over the wire codec: renderer
/// state queries, re-render commands, heatmap and sample transfer, and
/// plugin dispatch. Polls the cancellation token at its suspension points
/// so an external interrupt stops the loop cleanly.
pub struct DebugServer {
    backend: Box<dyn RenderInterface>,
    plugins: PluginRegistry,
    samples: Arc<SampleLog>,
    cancel: CancelToken,
}

impl DebugServer {
    pub fn new(backend: Box<dyn RenderInterface>, cancel: CancelToken) -> Self {
        Self {
            backend,
            plugins: PluginRegistry::new(),
            samples: SampleLog::new(),
            cancel,
        }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.add_plugin(plugin);
    }

    /// The sink to install on the capture bridge so committed samples
    /// reach this server's drain queue.
    pub fn sample_log(&self) -> Arc<SampleLog> {
        Arc::clone(&self.samples)
    }

    pub fn run(&mut self, config: &ServerConfig) -> std::io::Result<()> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))?;
        self.run_on(listener)
    }

    /// Accept loop over an already bound listener. Non-blocking so the
    /// cancellation token is honored between connection attempts.
    pub fn run_on(&mut self, listener: TcpListener) -> std::io::Result<()> {
        listener.set_nonblocking(true)?;
        info!("introspection server listening on {}", listener.local_addr()?);

        loop {
            if self.cancel.is_cancelled() {
                info!("introspection server stopping");
                break;
            }

            match listener.accept() {
                Ok((stream, addr)) => {
                    info!("client connected from {}", addr);
                    match self.serve_client(stream) {
                        Ok(ClientExit::Disconnect) => info!("client disconnected"),
                        Ok(ClientExit::Quit) => {
                            info!("client requested shutdown");
                            self.cancel.cancel();
                        }
                        Err(err) => warn!("client session failed: {:?}", err),
                    }
                }
                Err(ref err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(err) => warn!("accept failed: {}", err),
            }
        }

        Ok(())
    }

    fn serve_client(&mut self, stream: TcpStream) -> Result<ClientExit, WireError> {
        // the accepted stream inherits non-blocking mode from the listener
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(500)))?;
        let mut read_stream = stream.try_clone()?;
        let mut write_stream = stream;

        loop {
            let mut reader = WireReader::new(&mut read_stream);
            let code = match reader.read_i16() {
                Ok(code) => code,
                Err(WireError::Io(ref err))
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    if self.cancel.is_cancelled() {
                        return Ok(ClientExit::Disconnect);
                    }
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut writer = WireWriter::new(&mut write_stream);
            match code {
                messages::RENDERER_INFO => {
                    writer.write_i16(code)?;
                    writer.write_string(&self.backend.renderer_name())?;
                    writer.write_string(&self.backend.scene_name())?;
                    writer.write_string(&self.backend.output_path())?;
                    writer.write_u32(self.backend.sample_count())?;
                    writer.write_u32(self.backend.worker_count() as u32)?;
                    writer.flush()?;
                }
                messages::CAMERA_DATA => {
                    writer.write_i16(code)?;
                    self.backend.camera_data().write(&mut writer)?;
                    writer.flush()?;
                }
                messages::MESH_DATA => {
                    let meshes = self.backend.mesh_data();
                    writer.write_i16(code)?;
                    writer.write_u32(meshes.len() as u32)?;
                    for mesh in meshes.iter() {
                        mesh.write(&mut writer)?;
                    }
                    writer.flush()?;
                }
                messages::RENDER_IMAGE => {
                    self.backend.render_image();
                    writer.write_i16(code)?;
                    writer.write_string(&self.backend.output_path())?;
                    writer.flush()?;
                }
                messages::RENDER_PIXEL => {
                    let x = reader.read_i32()?;
                    let y = reader.read_i32()?;
                    self.backend.render_pixel(x.max(0) as u32, y.max(0) as u32);
                    writer.write_i16(code)?;
                    self.write_samples(&mut writer)?;
                    writer.flush()?;
                }
                messages::SAMPLE_DATA => {
                    writer.write_i16(code)?;
                    self.write_samples(&mut writer)?;
                    writer.flush()?;
                }
                messages::HEATMAP_DATA => {
                    writer.write_i16(code)?;
                    match DataBridge::instance().heatmap_snapshot() {
                        Some(snapshot) => {
                            writer.write_bool(true)?;
                            snapshot.write(&mut writer)?;
                        }
                        None => writer.write_bool(false)?,
                    }
                    writer.flush()?;
                }
                messages::SET_SAMPLE_COUNT => {
                    let sample_count = reader.read_u32()?;
                    self.backend.set_sample_count(sample_count);
                    writer.write_i16(code)?;
                    writer.write_u32(self.backend.sample_count())?;
                    writer.flush()?;
                }
                messages::DISCONNECT => {
                    writer.write_i16(code)?;
                    writer.flush()?;
                    return Ok(ClientExit::Disconnect);
                }
                messages::QUIT => {
                    writer.write_i16(code)?;
                    writer.flush()?;
                    return Ok(ClientExit::Quit);
                }
                plugin_code => {
                    match self.plugins.by_id(plugin_code) {
                        Some(plugin) => {
                            // a malformed payload leaves the stream position
                            // unknown, so the session ends on decode errors
                            plugin.deserialize(&mut reader)?;
                            plugin.run();
                            plugin.serialize(&mut writer)?;
                            writer.flush()?;
                        }
                        None => {
                            warn!("unsupported request code {}", code);
                            writer.write_i16(messages::UNSUPPORTED)?;
                            writer.write_i16(code)?;
                            writer.flush()?;
                        }
                    }
                }
            }
        }
    }

    fn write_samples(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        let samples = self.samples.drain();
        writer.write_u32(samples.len() as u32)?;
        for sample in samples.iter() {
            sample.write(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::camera::CameraData;
    use crate::core::interface::ShapeDescriptor;
    use crate::core::mesh::MeshData;
    use crate::math::constants::Vector3f;
    use crate::math::transform::Transform;

    use byteorder::{ LittleEndian, ReadBytesExt, WriteBytesExt };
    use std::io::Read;

    struct MockBackend {
        sample_count: u32,
        pixels_rendered: u32,
    }

    impl RenderInterface for MockBackend {
        fn renderer_name(&self) -> String {
            "mock renderer".to_string()
        }

        fn scene_name(&self) -> String {
            "two_quads.xml".to_string()
        }

        fn output_path(&self) -> String {
            "/tmp/two_quads.exr".to_string()
        }

        fn sample_count(&self) -> u32 {
            self.sample_count
        }

        fn set_sample_count(&mut self, sample_count: u32) {
            self.sample_count = sample_count;
        }

        fn worker_count(&self) -> usize {
            4
        }

        fn render_image(&mut self) {}

        fn render_pixel(&mut self, _x: u32, _y: u32) {
            self.pixels_rendered += 1;
        }

        fn camera_data(&self) -> CameraData {
            let to_world = Transform::look_at(Vector3f::new(0.0, -4.0, 1.0),
                                              Vector3f::new(0.0, 0.0, 1.0),
                                              Vector3f::new(0.0, 0.0, 1.0));
            CameraData::from_transform(0.1, 100.0, 10.0, 40.0, &to_world)
        }

        fn mesh_data(&self) -> Vec<MeshData> {
            Vec::new()
        }

        fn shape_descriptors(&self) -> Vec<ShapeDescriptor> {
            Vec::new()
        }
    }

    #[test]
    fn test_loopback_session() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let cancel = CancelToken::new();
        let mut server = DebugServer::new(Box::new(MockBackend { sample_count: 32, pixels_rendered: 0 }), cancel.clone());

        let handle = thread::spawn(move || server.run_on(listener));

        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        // renderer info
        client.write_i16::<LittleEndian>(messages::RENDERER_INFO).unwrap();
        assert_eq!(client.read_i16::<LittleEndian>().unwrap(), messages::RENDERER_INFO);
        let mut read_string = |client: &mut TcpStream| {
            let length = client.read_i32::<LittleEndian>().unwrap();
            let mut buffer = vec![0u8; length as usize];
            client.read_exact(&mut buffer).unwrap();
            String::from_utf8(buffer).unwrap()
        };
        assert_eq!(read_string(&mut client), "mock renderer");
        assert_eq!(read_string(&mut client), "two_quads.xml");
        assert_eq!(read_string(&mut client), "/tmp/two_quads.exr");
        assert_eq!(client.read_u32::<LittleEndian>().unwrap(), 32);
        assert_eq!(client.read_u32::<LittleEndian>().unwrap(), 4);

        // camera data
        client.write_i16::<LittleEndian>(messages::CAMERA_DATA).unwrap();
        assert_eq!(client.read_i16::<LittleEndian>().unwrap(), messages::CAMERA_DATA);
        let mut camera_floats = [0.0f32; 13];
        for value in camera_floats.iter_mut() {
            *value = client.read_f32::<LittleEndian>().unwrap();
        }
        assert_eq!(camera_floats[0], 0.1);
        assert_eq!(camera_floats[3], 40.0);

        // unsupported code gets a typed reply, not a dropped session
        client.write_i16::<LittleEndian>(0x0042).unwrap();
        assert_eq!(client.read_i16::<LittleEndian>().unwrap(), messages::UNSUPPORTED);
        assert_eq!(client.read_i16::<LittleEndian>().unwrap(), 0x0042);

        // quit stops the accept loop
        client.write_i16::<LittleEndian>(messages::QUIT).unwrap();
        assert_eq!(client.read_i16::<LittleEndian>().unwrap(), messages::QUIT);

        handle.join().unwrap().unwrap();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_sample_log_drains_once() {
        let log = SampleLog::new();
        log.push(PathSample::new(0));
        log.push(PathSample::new(1));

        assert_eq!(log.len(), 2);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }
}
