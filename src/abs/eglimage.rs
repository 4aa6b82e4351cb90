//! EGLImage-style image sharing.
//!
//! Lets an existing GL texture be exposed as an EGLImage and targeted into a
//! second texture object, so both share one block of GPU memory. The entry
//! points are extensions and never appear in standard headers, so they are
//! resolved by name at runtime through whatever proc-address loader the
//! context provides (the same one glow is built from).

use std::ffi::c_void;

use glow::HasContext;

use crate::error::DemoError;

type EglDisplay = *mut c_void;
type EglContext = *mut c_void;
type EglImageKhr = *mut c_void;
type EglInt = i32;
type EglEnum = u32;
type EglBoolean = u32;

type EglCreateImageKhrFn = unsafe extern "C" fn(
    EglDisplay,
    EglContext,
    EglEnum,
    *mut c_void,
    *const EglInt,
) -> EglImageKhr;
type EglDestroyImageKhrFn = unsafe extern "C" fn(EglDisplay, EglImageKhr) -> EglBoolean;
type ImageTargetTexture2DFn = unsafe extern "C" fn(u32, EglImageKhr);
type EglGetCurrentDisplayFn = unsafe extern "C" fn() -> EglDisplay;
type EglGetCurrentContextFn = unsafe extern "C" fn() -> EglContext;

const EGL_NONE: EglInt = 0x3038;
const EGL_TRUE: EglInt = 1;
const EGL_IMAGE_PRESERVED_KHR: EglInt = 0x30D2;
const EGL_GL_TEXTURE_LEVEL_KHR: EglInt = 0x30BC;
const EGL_GL_TEXTURE_2D_KHR: EglEnum = 0x30B1;

fn resolve<T: Copy, F: FnMut(&str) -> *const c_void>(
    loader: &mut F,
    name: &'static str,
) -> Result<T, DemoError> {
    let ptr = loader(name);
    if ptr.is_null() {
        return Err(DemoError::MissingExtension(name));
    }
    // Fn pointer types are the same size as data pointers on every platform
    // EGL exists on.
    Ok(unsafe { std::mem::transmute_copy::<*const c_void, T>(&ptr) })
}

/// The dynamically resolved image-sharing entry points.
///
/// Owned by whoever drives setup rather than living in statics, so a context
/// going away takes its function pointers with it.
#[derive(Debug)]
pub struct EglImageExt {
    create_image: EglCreateImageKhrFn,
    destroy_image: EglDestroyImageKhrFn,
    image_target_texture_2d: ImageTargetTexture2DFn,
    get_current_display: EglGetCurrentDisplayFn,
    get_current_context: EglGetCurrentContextFn,
}

impl EglImageExt {
    /// Resolves the extension entry points through `loader`. Fails with the
    /// name of the first symbol the loader cannot provide.
    pub fn load<F: FnMut(&str) -> *const c_void>(mut loader: F) -> Result<Self, DemoError> {
        Ok(Self {
            create_image: resolve(&mut loader, "eglCreateImageKHR")?,
            destroy_image: resolve(&mut loader, "eglDestroyImageKHR")?,
            image_target_texture_2d: resolve(&mut loader, "glEGLImageTargetTexture2DOES")?,
            get_current_display: resolve(&mut loader, "eglGetCurrentDisplay")?,
            get_current_context: resolve(&mut loader, "eglGetCurrentContext")?,
        })
    }

    /// Creates an EGLImage backed by level 0 of the given GL texture on the
    /// current display and context.
    ///
    /// The source texture must keep its storage alive for as long as the
    /// image (and any texture the image is targeted into) is in use.
    pub fn create_from_texture(&self, texture: glow::Texture) -> Result<SharedImage, DemoError> {
        let attribs = [
            EGL_IMAGE_PRESERVED_KHR,
            EGL_TRUE,
            EGL_GL_TEXTURE_LEVEL_KHR,
            0,
            EGL_NONE,
            EGL_NONE,
        ];
        // The client buffer for EGL_GL_TEXTURE_2D_KHR is the texture name
        // itself, smuggled through the pointer argument.
        let client_buffer = texture.0.get() as usize as *mut c_void;

        let (display, image) = unsafe {
            let display = (self.get_current_display)();
            let context = (self.get_current_context)();
            let image = (self.create_image)(
                display,
                context,
                EGL_GL_TEXTURE_2D_KHR,
                client_buffer,
                attribs.as_ptr(),
            );
            (display, image)
        };
        if image.is_null() {
            return Err(DemoError::ImageCreation);
        }

        Ok(SharedImage {
            image,
            display,
            destroy_image: self.destroy_image,
            image_target_texture_2d: self.image_target_texture_2d,
        })
    }
}

/// An EGLImage handle plus everything needed to release it.
///
/// Destroyed exactly once, on drop.
#[derive(Debug)]
pub struct SharedImage {
    image: EglImageKhr,
    display: EglDisplay,
    destroy_image: EglDestroyImageKhrFn,
    image_target_texture_2d: ImageTargetTexture2DFn,
}

impl SharedImage {
    /// Makes `texture` an alias of the image's storage. After this call,
    /// whatever the image's backing holds is what sampling `texture` returns;
    /// the texture must not get its own storage through `tex_image_2d`.
    pub fn bind_to_texture(&self, gl: &glow::Context, texture: glow::Texture) {
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            (self.image_target_texture_2d)(glow::TEXTURE_2D, self.image);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }
}

impl Drop for SharedImage {
    fn drop(&mut self) {
        unsafe {
            (self.destroy_image)(self.display, self.image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESTROY_CALLS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn fake_create(
        _display: EglDisplay,
        _context: EglContext,
        _target: EglEnum,
        buffer: *mut c_void,
        _attribs: *const EglInt,
    ) -> EglImageKhr {
        buffer
    }

    unsafe extern "C" fn fake_create_failing(
        _display: EglDisplay,
        _context: EglContext,
        _target: EglEnum,
        _buffer: *mut c_void,
        _attribs: *const EglInt,
    ) -> EglImageKhr {
        std::ptr::null_mut()
    }

    unsafe extern "C" fn fake_destroy(_display: EglDisplay, _image: EglImageKhr) -> EglBoolean {
        DESTROY_CALLS.fetch_add(1, Ordering::SeqCst);
        1
    }

    unsafe extern "C" fn fake_target(_target: u32, _image: EglImageKhr) {}

    unsafe extern "C" fn fake_display() -> EglDisplay {
        std::ptr::null_mut()
    }

    unsafe extern "C" fn fake_context() -> EglContext {
        std::ptr::null_mut()
    }

    fn fake_loader(create: EglCreateImageKhrFn) -> impl FnMut(&str) -> *const c_void {
        move |name| match name {
            "eglCreateImageKHR" => create as *const c_void,
            "eglDestroyImageKHR" => fake_destroy as *const c_void,
            "glEGLImageTargetTexture2DOES" => fake_target as *const c_void,
            "eglGetCurrentDisplay" => fake_display as *const c_void,
            "eglGetCurrentContext" => fake_context as *const c_void,
            _ => std::ptr::null(),
        }
    }

    fn texture(id: u32) -> glow::Texture {
        glow::NativeTexture(NonZeroU32::new(id).unwrap())
    }

    #[test]
    fn load_fails_naming_the_missing_symbol() {
        let mut base = fake_loader(fake_create);
        let err = EglImageExt::load(|name| {
            if name == "glEGLImageTargetTexture2DOES" {
                std::ptr::null()
            } else {
                base(name)
            }
        })
        .unwrap_err();
        match err {
            DemoError::MissingExtension(name) => {
                assert_eq!(name, "glEGLImageTargetTexture2DOES")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_image_is_a_creation_error() {
        let ext = EglImageExt::load(fake_loader(fake_create_failing)).unwrap();
        let err = ext.create_from_texture(texture(3)).unwrap_err();
        assert!(matches!(err, DemoError::ImageCreation));
    }

    #[test]
    fn shared_image_is_destroyed_exactly_once() {
        let ext = EglImageExt::load(fake_loader(fake_create)).unwrap();
        let before = DESTROY_CALLS.load(Ordering::SeqCst);
        let image = ext.create_from_texture(texture(7)).unwrap();
        drop(image);
        assert_eq!(DESTROY_CALLS.load(Ordering::SeqCst), before + 1);
    }
}
