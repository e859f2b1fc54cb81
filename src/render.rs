use crate::{
    assets::SourceImageCache,
    cid::{self, CidVersion},
    composite::Surface,
    config::Dimensions,
    error::EngineResult,
    model::Selection,
};

#[derive(Clone, Debug)]
pub struct RenderedSurface {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
    pub content_id: String,
}

/// Composite a selection at the given dimensions and identify the
/// result by its encoded bytes.
///
/// Attributes paint in selection order onto a transparent surface, each
/// stretched to fill. Invisible attributes still paint; visibility only
/// hides them from metadata.
pub fn render_selection(
    selection: &Selection,
    dims: Dimensions,
    cache: &mut SourceImageCache,
    version: CidVersion,
) -> EngineResult<RenderedSurface> {
    let mut surface = Surface::new(dims);
    for attribute in selection {
        let source = cache.fetch(&attribute.path, dims)?;
        surface.paint(&source, attribute.blend, attribute.opacity)?;
    }
    let png = surface.encode_png()?;
    let content_id = cid::content_id(&png, version);
    Ok(RenderedSurface {
        width: dims.width,
        height: dims.height,
        png,
        content_id,
    })
}
