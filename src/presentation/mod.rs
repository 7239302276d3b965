// Presentation layer - renderers consuming core notifications
pub mod console_renderer;
