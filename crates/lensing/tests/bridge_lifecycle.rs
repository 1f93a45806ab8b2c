use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use lensing::{
    BackendFactory, Bridge, ErrorCode, FrameSource, FrameTarget, RenderBackend, RenderError,
    RenderUniforms, RendererHandle, Reply, Request, Response, TextureRegistry,
};

#[derive(Clone, Debug, PartialEq)]
struct FakeSurface {
    id: u32,
    width: u32,
    height: u32,
}

impl FrameTarget for FakeSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Allocated(u32, u32),
    Dispatched { surface: u32, has_bg: bool },
    Registered(RendererHandle),
    FrameAvailable(RendererHandle),
    Unregistered(RendererHandle),
}

#[derive(Default)]
struct Shared {
    events: Vec<Event>,
    next_surface: u32,
    max_dimension: u32,
    fail_dispatch: bool,
    fail_background: bool,
    no_device: bool,
}

type Log = Rc<RefCell<Shared>>;

struct FakeBackend {
    log: Log,
}

impl RenderBackend for FakeBackend {
    type Surface = FakeSurface;
    type Background = (u32, u32);

    fn allocate_surface(&mut self, width: u32, height: u32) -> Result<FakeSurface, RenderError> {
        let mut log = self.log.borrow_mut();
        if width > log.max_dimension || height > log.max_dimension {
            return Err(RenderError::AllocationFailure {
                what: "frame surface",
                width,
                height,
                reason: "over limit".into(),
            });
        }
        log.next_surface += 1;
        log.events.push(Event::Allocated(width, height));
        Ok(FakeSurface {
            id: log.next_surface,
            width,
            height,
        })
    }

    fn upload_background(
        &mut self,
        _pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(u32, u32), RenderError> {
        if self.log.borrow().fail_background {
            return Err(RenderError::AllocationFailure {
                what: "background texture",
                width,
                height,
                reason: "out of memory".into(),
            });
        }
        Ok((width, height))
    }

    fn dispatch(
        &mut self,
        surface: &FakeSurface,
        uniforms: &RenderUniforms,
        background: Option<&(u32, u32)>,
    ) -> Result<(), RenderError> {
        let mut log = self.log.borrow_mut();
        if log.fail_dispatch {
            return Err(RenderError::DispatchFailed("device lost".into()));
        }
        assert_eq!(uniforms.has_background(), background.is_some());
        log.events.push(Event::Dispatched {
            surface: surface.id,
            has_bg: uniforms.has_background(),
        });
        Ok(())
    }
}

struct FakeFactory {
    log: Log,
}

impl BackendFactory for FakeFactory {
    type Backend = FakeBackend;

    fn create(&self) -> Result<FakeBackend, RenderError> {
        if self.log.borrow().no_device {
            return Err(RenderError::DeviceUnavailable("no adapter".into()));
        }
        Ok(FakeBackend {
            log: Rc::clone(&self.log),
        })
    }

    fn probe(&self) -> bool {
        !self.log.borrow().no_device
    }
}

struct RecordingRegistry {
    log: Log,
    next_id: i64,
    sources: HashMap<RendererHandle, FrameSource<FakeSurface>>,
}

impl TextureRegistry<FakeSurface> for RecordingRegistry {
    fn register_texture(&mut self, source: FrameSource<FakeSurface>) -> RendererHandle {
        self.next_id += 1;
        let handle = RendererHandle(self.next_id);
        self.sources.insert(handle, source);
        self.log.borrow_mut().events.push(Event::Registered(handle));
        handle
    }

    fn texture_frame_available(&mut self, handle: RendererHandle) {
        self.log
            .borrow_mut()
            .events
            .push(Event::FrameAvailable(handle));
    }

    fn unregister_texture(&mut self, handle: RendererHandle) {
        self.sources.remove(&handle);
        self.log
            .borrow_mut()
            .events
            .push(Event::Unregistered(handle));
    }
}

fn setup() -> (TestBridge, Log) {
    let log: Log = Rc::new(RefCell::new(Shared {
        max_dimension: 2048,
        ..Shared::default()
    }));
    let bridge = Bridge::new(
        FakeFactory {
            log: Rc::clone(&log),
        },
        RecordingRegistry {
            log: Rc::clone(&log),
            next_id: 0,
            sources: HashMap::new(),
        },
    );
    (bridge, log)
}

fn render_request(handle: RendererHandle, width: i64, height: i64) -> Request {
    let payload = format!(
        r#"{{"method":"render","args":{{"handle":{},"pos":[0.0,0.0,5.0],"target":[0.0,0.0,0.0],
            "up":[0.0,1.0,0.0],"fovY":1.0,"rS":1.0,"cubeHalfSize":10.0,"maxSteps":200,
            "dLambda":0.05,"width":{width},"height":{height}}}}}"#,
        handle.0
    );
    Request::decode(&payload).unwrap()
}

type TestBridge = Bridge<FakeFactory, RecordingRegistry>;

fn create(bridge: &mut TestBridge, width: i64, height: i64) -> RendererHandle {
    match bridge.handle(Request::Create { width, height }) {
        Response::Ok(Reply::Handle(handle)) => handle,
        other => panic!("create failed: {other:?}"),
    }
}

fn error_code(response: Response) -> ErrorCode {
    match response {
        Response::Error(err) => err.code,
        other => panic!("expected an error, got {other:?}"),
    }
}

fn take_events(log: &Log) -> Vec<Event> {
    std::mem::take(&mut log.borrow_mut().events)
}

#[test]
fn create_render_resize_dispose_scenario() {
    let (mut bridge, log) = setup();

    let handle = create(&mut bridge, 256, 256);
    assert_eq!(
        take_events(&log),
        vec![Event::Allocated(256, 256), Event::Registered(handle)]
    );

    assert_eq!(bridge.handle(render_request(handle, 256, 256)), Response::Ok(Reply::Unit));
    assert_eq!(
        take_events(&log),
        vec![
            Event::Dispatched {
                surface: 1,
                has_bg: false
            },
            Event::FrameAvailable(handle),
        ]
    );

    assert_eq!(bridge.handle(render_request(handle, 512, 512)), Response::Ok(Reply::Unit));
    assert_eq!(
        take_events(&log),
        vec![
            Event::Allocated(512, 512),
            Event::Dispatched {
                surface: 2,
                has_bg: false
            },
            Event::FrameAvailable(handle),
        ]
    );

    for _ in 0..3 {
        bridge.handle(render_request(handle, 512, 512));
    }
    let events = take_events(&log);
    assert!(!events.iter().any(|event| matches!(event, Event::Allocated(..))));
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == Event::FrameAvailable(handle))
            .count(),
        3
    );
    assert_eq!(bridge.renderer(handle).unwrap().surface_allocations(), 2);

    assert_eq!(
        bridge.handle(Request::Dispose { handle }),
        Response::Ok(Reply::Unit)
    );
    assert_eq!(take_events(&log), vec![Event::Unregistered(handle)]);
    assert!(bridge.registry().sources.is_empty());

    assert_eq!(error_code(bridge.handle(render_request(handle, 512, 512))), ErrorCode::NoTex);
    let background = Request::SetBackground {
        handle,
        width: 1,
        height: 1,
        rgba: vec![0; 4],
    };
    assert_eq!(error_code(bridge.handle(background)), ErrorCode::NoTex);
}

#[test]
fn render_before_create_is_no_tex() {
    let (mut bridge, log) = setup();
    let response = bridge.handle(render_request(RendererHandle(42), 64, 64));
    assert_eq!(error_code(response), ErrorCode::NoTex);
    assert!(take_events(&log).is_empty());
}

#[test]
fn frame_source_only_sees_completed_frames() {
    let (mut bridge, _log) = setup();
    let handle = create(&mut bridge, 64, 32);
    let source = bridge.registry().sources[&handle].clone();

    // Nothing has been dispatched yet, so there is nothing to read.
    assert!(source.copy_frame().is_none());

    bridge.handle(render_request(handle, 64, 32));
    assert_eq!(source.copy_frame().map(|surface| surface.size()), Some((64, 32)));
}

#[test]
fn background_is_bound_for_later_frames() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 16, 16);

    let response = bridge.handle(Request::SetBackground {
        handle,
        width: 2,
        height: 2,
        rgba: vec![255; 16],
    });
    assert_eq!(response, Response::Ok(Reply::Unit));
    take_events(&log);

    bridge.handle(render_request(handle, 16, 16));
    assert!(take_events(&log).contains(&Event::Dispatched {
        surface: 1,
        has_bg: true
    }));
}

#[test]
fn bad_background_payload_is_rejected_and_keeps_previous() {
    let (mut bridge, _log) = setup();
    let handle = create(&mut bridge, 16, 16);
    bridge.handle(Request::SetBackground {
        handle,
        width: 2,
        height: 1,
        rgba: vec![7; 8],
    });

    let response = bridge.handle(Request::SetBackground {
        handle,
        width: 2,
        height: 2,
        rgba: vec![0; 15],
    });
    assert_eq!(error_code(response), ErrorCode::BadArgs);

    let background = bridge.renderer(handle).unwrap().background().unwrap();
    assert_eq!((background.width, background.height), (2, 1));
    assert_eq!(background.pixels(), &[7; 8]);
}

#[test]
fn unaddressable_background_extent_is_bad_args() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 16, 16);
    take_events(&log);

    let response = bridge.handle(Request::SetBackground {
        handle,
        width: 4_294_967_295,
        height: 4_294_967_295,
        rgba: vec![0; 4],
    });
    assert_eq!(error_code(response), ErrorCode::BadArgs);
    assert!(bridge.renderer(handle).unwrap().background().is_none());

    // The bridge keeps serving the handle afterwards.
    assert_eq!(bridge.handle(render_request(handle, 16, 16)), Response::Ok(Reply::Unit));
    assert!(take_events(&log).contains(&Event::FrameAvailable(handle)));
}

#[test]
fn background_allocation_failure_is_silent() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 16, 16);
    log.borrow_mut().fail_background = true;

    let response = bridge.handle(Request::SetBackground {
        handle,
        width: 4,
        height: 4,
        rgba: vec![1; 64],
    });
    assert_eq!(response, Response::Ok(Reply::Unit));
    assert!(bridge.renderer(handle).unwrap().background().is_none());
}

#[test]
fn dispatch_failure_reports_and_does_not_notify() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 32, 32);
    bridge.handle(render_request(handle, 32, 32));
    let source = bridge.registry().sources[&handle].clone();
    let published = source.copy_frame();
    take_events(&log);

    log.borrow_mut().fail_dispatch = true;
    let response = bridge.handle(render_request(handle, 32, 32));
    assert_eq!(error_code(response), ErrorCode::RenderFailed);
    assert!(take_events(&log).is_empty());
    assert_eq!(source.copy_frame(), published);
}

#[test]
fn failed_resize_still_notifies_with_an_empty_frame_slot() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 32, 32);
    bridge.handle(render_request(handle, 32, 32));
    take_events(&log);

    let response = bridge.handle(render_request(handle, 4096, 32));
    assert_eq!(response, Response::Ok(Reply::Unit));
    assert_eq!(take_events(&log), vec![Event::FrameAvailable(handle)]);
    assert!(bridge.registry().sources[&handle].copy_frame().is_none());

    // The renderer stays usable at a size the device accepts.
    assert_eq!(bridge.handle(render_request(handle, 32, 32)), Response::Ok(Reply::Unit));
    assert!(take_events(&log).contains(&Event::FrameAvailable(handle)));
}

#[test]
fn create_failures_register_nothing() {
    let (mut bridge, log) = setup();

    let response = bridge.handle(Request::Create {
        width: 0,
        height: 10,
    });
    assert_eq!(error_code(response), ErrorCode::BadArgs);

    let response = bridge.handle(Request::Create {
        width: 4096,
        height: 10,
    });
    assert_eq!(error_code(response), ErrorCode::ResizeFailed);

    log.borrow_mut().no_device = true;
    let response = bridge.handle(Request::Create {
        width: 10,
        height: 10,
    });
    assert_eq!(error_code(response), ErrorCode::NoDevice);
    assert_eq!(bridge.handle(Request::Probe), Response::Ok(Reply::Available(false)));

    assert!(!take_events(&log)
        .iter()
        .any(|event| matches!(event, Event::Registered(_))));
    assert_eq!(bridge.live_handles().count(), 0);
}

#[test]
fn invalid_camera_is_bad_args() {
    let (mut bridge, log) = setup();
    let handle = create(&mut bridge, 8, 8);
    take_events(&log);

    let Request::Render(mut args) = render_request(handle, 8, 8) else {
        unreachable!();
    };
    args.max_steps = 0;
    assert_eq!(error_code(bridge.handle(Request::Render(args))), ErrorCode::BadArgs);
    assert!(take_events(&log).is_empty());
}

#[test]
fn handles_are_independent() {
    let (mut bridge, log) = setup();
    let first = create(&mut bridge, 8, 8);
    let second = create(&mut bridge, 16, 16);
    assert_ne!(first, second);
    take_events(&log);

    bridge.handle(Request::Dispose { handle: first });
    assert_eq!(bridge.handle(render_request(second, 16, 16)), Response::Ok(Reply::Unit));
    assert_eq!(
        take_events(&log),
        vec![
            Event::Unregistered(first),
            Event::Dispatched {
                surface: 2,
                has_bg: false
            },
            Event::FrameAvailable(second),
        ]
    );

    // Disposing twice is a no-op.
    bridge.handle(Request::Dispose { handle: first });
    assert!(take_events(&log).is_empty());
}
