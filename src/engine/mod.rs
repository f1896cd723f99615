pub mod blender;
pub mod types;

use anyhow::Result;

pub use types::{RenderInvocation, RendererDiag};

pub trait Renderer {
    fn doctor(&self) -> Result<RendererDiag>;
    /// Runs the render to completion, handing each output line to `on_line`
    /// in the order the renderer wrote it.
    fn render(
        &self,
        inv: &RenderInvocation,
        on_line: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()>;
}
