//! X11 window and its event thread

use log::{debug, info, warn};
use peridot_glyph::{EventSender, WindowEvent};
use std::sync::Arc;
use xcb::XidNew;

#[derive(Debug)]
pub enum X11Error {
    Connection(xcb::ConnError),
    Protocol(xcb::Error),
    NoScreen,
}
impl From<xcb::ConnError> for X11Error {
    fn from(value: xcb::ConnError) -> Self {
        Self::Connection(value)
    }
}
impl From<xcb::Error> for X11Error {
    fn from(value: xcb::Error) -> Self {
        Self::Protocol(value)
    }
}
impl std::fmt::Display for X11Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "x11 connection error: {e}"),
            Self::Protocol(e) => write!(f, "x11 protocol error: {e}"),
            Self::NoScreen => f.write_str("x11 server reported no screen"),
        }
    }
}
impl std::error::Error for X11Error {}

pub struct X11 {
    con: Arc<xcb::Connection>,
    wm_delete_window: xcb::x::Atom,
    vis: xcb::x::Visualid,
    mainwnd_id: xcb::x::Window,
}
impl X11 {
    pub fn init(title: &str, width: u16, height: u16) -> Result<Self, X11Error> {
        let (con, screen_index) = xcb::Connection::connect(None)?;
        let s0 = con
            .get_setup()
            .roots()
            .nth(screen_index as _)
            .ok_or(X11Error::NoScreen)?;
        let vis = s0.root_visual();

        let wm_protocols = con.send_request(&xcb::x::InternAtom {
            only_if_exists: false,
            name: b"WM_PROTOCOLS",
        });
        let wm_delete_window = con.send_request(&xcb::x::InternAtom {
            only_if_exists: false,
            name: b"WM_DELETE_WINDOW",
        });
        con.flush()?;
        let wm_protocols = con.wait_for_reply(wm_protocols)?.atom();
        let wm_delete_window = con.wait_for_reply(wm_delete_window)?.atom();

        let mainwnd_id = con.generate_id();
        con.send_request(&xcb::x::CreateWindow {
            wid: mainwnd_id,
            parent: s0.root(),
            x: 0,
            y: 0,
            width,
            height,
            border_width: 0,
            class: xcb::x::WindowClass::InputOutput,
            depth: s0.root_depth(),
            visual: vis,
            value_list: &[xcb::x::Cw::EventMask(
                xcb::x::EventMask::KEY_PRESS
                    | xcb::x::EventMask::KEY_RELEASE
                    | xcb::x::EventMask::STRUCTURE_NOTIFY,
            )],
        });
        con.send_request(&xcb::x::ChangeProperty {
            mode: xcb::x::PropMode::Replace,
            window: mainwnd_id,
            property: xcb::x::ATOM_WM_NAME,
            r#type: xcb::x::ATOM_STRING,
            data: title.as_bytes(),
        });
        con.send_request(&xcb::x::ChangeProperty {
            mode: xcb::x::PropMode::Append,
            window: mainwnd_id,
            property: wm_protocols,
            r#type: xcb::x::ATOM_ATOM,
            data: &[wm_delete_window],
        });
        con.flush()?;
        info!("X11 window {width}x{height} created");

        Ok(Self {
            con: Arc::new(con),
            wm_delete_window,
            vis,
            mainwnd_id,
        })
    }

    pub fn show(&self) -> Result<(), X11Error> {
        self.con.send_request(&xcb::x::MapWindow {
            window: self.mainwnd_id,
        });
        self.con.flush().map_err(From::from)
    }

    pub fn connection(&self) -> &Arc<xcb::Connection> {
        &self.con
    }

    pub const fn visual(&self) -> xcb::x::Visualid {
        self.vis
    }

    pub const fn window(&self) -> xcb::x::Window {
        self.mainwnd_id
    }

    /// Forwards window events until the connection fails or the frame loop goes away.
    ///
    /// The thread is detached: it stays blocked in `wait_for_event` until the process exits.
    pub fn spawn_event_thread(&self, sender: EventSender) -> std::io::Result<()> {
        let con = self.con.clone();
        let wm_delete_window = self.wm_delete_window;
        let mut last_size = None;

        std::thread::Builder::new()
            .name(String::from("x11-events"))
            .spawn(move || loop {
                let ev = match con.wait_for_event() {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("x11 event thread exits: {e}");
                        break;
                    }
                };
                let Some(we) = translate_event(&ev, wm_delete_window, &mut last_size) else {
                    continue;
                };
                if sender.send(we).is_err() {
                    debug!("event queue closed");
                    break;
                }
            })
            .map(drop)
    }
}

fn translate_event(
    ev: &xcb::Event,
    wm_delete_window: xcb::x::Atom,
    last_size: &mut Option<(u32, u32)>,
) -> Option<WindowEvent> {
    match ev {
        xcb::Event::X(xcb::x::Event::KeyPress(e)) => Some(WindowEvent::KeyDown {
            code: e.detail() as _,
        }),
        xcb::Event::X(xcb::x::Event::KeyRelease(e)) => Some(WindowEvent::KeyUp {
            code: e.detail() as _,
        }),
        xcb::Event::X(xcb::x::Event::ClientMessage(e)) => match e.data() {
            xcb::x::ClientMessageData::Data32(d)
                if unsafe { xcb::x::Atom::new(d[0]) } == wm_delete_window =>
            {
                Some(WindowEvent::CloseRequested)
            }
            _ => None,
        },
        // ConfigureNotify also reports moves; only size changes are forwarded
        xcb::Event::X(xcb::x::Event::ConfigureNotify(e)) => {
            let size = (e.width() as u32, e.height() as u32);
            if last_size.replace(size) == Some(size) {
                return None;
            }

            Some(WindowEvent::Resized {
                width: size.0,
                height: size.1,
            })
        }
        _ => {
            debug!("Unhandled Event: {ev:?}");
            None
        }
    }
}
