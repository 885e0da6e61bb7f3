use glow::{
    ALWAYS, BLEND, DEBUG_OUTPUT, DEBUG_OUTPUT_SYNCHRONOUS, DEPTH_TEST, HasContext, LEQUAL, ONE, ONE_MINUS_SRC_ALPHA,
    SRC_ALPHA, ZERO,
};
use rdpshade_core::{BlendFlags, BlendMode};

/// Apply the render state of a batch.
///
/// Viewports have their origin in the top left corner, `target_height` is the height
/// of the framebuffer being drawn to.
pub fn apply_blend_flags(gl: &impl HasContext, flags: &BlendFlags, target_height: u32) {
    unsafe {
        gl.enable(DEPTH_TEST);
        gl.depth_mask(flags.z_update);
        gl.depth_func(if flags.z_test { LEQUAL } else { ALWAYS });

        match blend_func(flags.blend_mode) {
            Some((src, dst)) => {
                gl.enable(BLEND);
                gl.blend_func(src, dst);
            }
            None => gl.disable(BLEND),
        }

        let viewport = flags.viewport;
        gl.viewport(
            viewport.x as i32,
            target_height as i32 - (viewport.y + viewport.height) as i32,
            viewport.width as i32,
            viewport.height as i32,
        );
    }
}

fn blend_func(mode: BlendMode) -> Option<(u32, u32)> {
    match mode {
        BlendMode::Disabled => None,
        BlendMode::Add => Some((ONE, ONE)),
        BlendMode::Opaque => Some((ONE, ZERO)),
        BlendMode::Interpolated => Some((SRC_ALPHA, ONE_MINUS_SRC_ALPHA)),
        BlendMode::KeepDestination => Some((ZERO, ONE)),
    }
}

pub fn enable_debug(gl: &mut impl HasContext) {
    if !cfg!(debug_assertions) {
        return;
    }

    unsafe {
        gl.enable(DEBUG_OUTPUT);
        gl.enable(DEBUG_OUTPUT_SYNCHRONOUS);
        gl.debug_message_callback(|source, kind, id, severity, message| {
            tracing::debug!(source, kind, id, severity, "{message}");
        });
    }
}
