pub mod buffer;
pub mod frame_buffer;
pub mod log_context;
pub mod pipeline;
pub mod render_states;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod thread_pool;
pub mod vertex;
