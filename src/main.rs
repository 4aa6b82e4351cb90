use std::sync::Arc;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use crate::abs::App;
use crate::demo::Demo;
use crate::error::DemoError;

mod abs;
mod demo;
mod error;

fn init_logging() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
        .ok();
}

fn run() -> Result<(), DemoError> {
    let mut app = App::new("Simple Texture 2D", 320, 240)?;
    let mut demo = Demo::new(Arc::clone(&app.gl));
    demo.setup(&app)?;

    'running: loop {
        for event in app.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                _ => {}
            }
        }

        let (width, height) = app.window.drawable_size();
        demo.draw(width, height)?;
        app.window.gl_swap_window();
    }

    demo.teardown()
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
