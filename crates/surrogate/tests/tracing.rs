//! Tracer hooks, the dispatch depth limit and configuration loading.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use surrogate::{
    ExcType, Op, ProfilingTracer, ProxyBase, ProxyConfig, ProxyFactory, RecordingTracer, Resolution, TraceEvent,
    Value, ops, proxy_id, resource::dispatch_depth,
};

fn recording_factory(config: ProxyConfig) -> (ProxyFactory, Arc<Mutex<RecordingTracer>>) {
    let recorder = Arc::new(Mutex::new(RecordingTracer::new()));
    (ProxyFactory::with_tracer(config, Arc::clone(&recorder)), recorder)
}

#[test]
fn records_synthesis_cache_hits_and_dispatches() {
    let (factory, recorder) = recording_factory(ProxyConfig::default());
    let p = factory.proxy(Value::list(vec![Value::Int(1)]));
    let _q = factory.proxy(Value::list(vec![]));
    ops::len(&p).unwrap();
    ops::getattr(&p, "append").unwrap();

    let events = recorder.lock().unwrap().events().to_vec();
    let id = proxy_id(&p).unwrap();
    assert!(matches!(&events[0], TraceEvent::Synthesize { type_name, .. } if type_name == "proxy[list]"));
    assert_eq!(
        events[1..],
        [
            TraceEvent::CacheHit {
                type_name: "proxy[list]".to_owned()
            },
            TraceEvent::Dispatch {
                proxy: id,
                op: Op::Len,
                attr: None,
                resolution: Resolution::Forwarded,
                depth: 1,
            },
            TraceEvent::Dispatch {
                proxy: id,
                op: Op::GetAttribute,
                attr: Some("append".to_owned()),
                resolution: Resolution::Forwarded,
                depth: 1,
            },
        ]
    );
}

#[test]
fn records_the_resolving_tier() {
    let (factory, recorder) = recording_factory(ProxyConfig::default());
    let base = ProxyBase::builder("traced")
        .direct("__len__", |_this, _args| Ok(Value::Int(0)))
        .direct("label", |_this, _args| Ok(Value::str("traced")))
        .build()
        .unwrap();
    let p = factory.proxy_with(Value::list(vec![]), &base).unwrap();
    let m = factory.mask_proxy(Value::list(vec![]), ["append"]);
    recorder.lock().unwrap().clear();

    ops::len(&p).unwrap();
    ops::getattr(&p, "label").unwrap();
    assert!(ops::getattr(&m, "append").is_err());
    ops::getattr(&m, "pop").unwrap();

    let resolutions: Vec<Resolution> = recorder
        .lock()
        .unwrap()
        .events()
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Dispatch { resolution, .. } => Some(*resolution),
            _ => None,
        })
        .collect();
    assert_eq!(
        resolutions,
        [Resolution::Override, Resolution::Direct, Resolution::Masked, Resolution::Forwarded]
    );
}

#[test]
fn nested_dispatch_reports_depth() {
    let (factory, recorder) = recording_factory(ProxyConfig::default());
    let inner = factory.proxy(Value::list(vec![Value::Int(1)]));
    let outer = factory.proxy(inner);
    recorder.lock().unwrap().clear();

    assert_eq!(ops::len(&outer).unwrap(), 1);
    let depths: Vec<usize> = recorder
        .lock()
        .unwrap()
        .events()
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Dispatch { depth, .. } => Some(*depth),
            _ => None,
        })
        .collect();
    assert_eq!(depths, [1, 2]);
    assert_eq!(dispatch_depth(), 0);
}

#[test]
fn runaway_override_hits_depth_limit() {
    let (factory, recorder) = recording_factory(ProxyConfig::default().max_dispatch_depth(Some(8)));
    let runaway = ProxyBase::builder("runaway")
        .direct("__len__", |this, _args| Ok(Value::Int(i64::try_from(ops::len(this)?).unwrap_or_default())))
        .build()
        .unwrap();
    let p = factory.proxy_with(Value::list(vec![]), &runaway).unwrap();

    let err = ops::len(&p).unwrap_err();
    assert!(err.matches(ExcType::RecursionError));
    assert!(err.to_string().contains("maximum proxy dispatch depth exceeded"));
    assert_eq!(dispatch_depth(), 0);

    let recorder = recorder.lock().unwrap();
    assert!(recorder.events().contains(&TraceEvent::DepthExceeded { limit: 8 }));
    let dispatches = recorder
        .events()
        .iter()
        .filter(|event| matches!(event, TraceEvent::Dispatch { .. }))
        .count();
    assert_eq!(dispatches, 8);
}

#[test]
fn unlimited_depth_when_disabled() {
    let factory = ProxyFactory::with_config(ProxyConfig::default().max_dispatch_depth(None));
    let mut value = Value::list(vec![Value::Int(1), Value::Int(2)]);
    for _ in 0..300 {
        value = factory.proxy(value);
    }
    assert_eq!(ops::len(&value).unwrap(), 2);

    let limited = ProxyFactory::new();
    let mut value = Value::list(vec![]);
    for _ in 0..300 {
        value = limited.proxy(value);
    }
    assert!(ops::len(&value).unwrap_err().matches(ExcType::RecursionError));
}

#[test]
fn profiling_counts_operations_and_tiers() {
    let profiler = Arc::new(Mutex::new(ProfilingTracer::new()));
    let factory = ProxyFactory::with_tracer(ProxyConfig::default(), Arc::clone(&profiler));
    let p = factory.proxy(Value::list(vec![Value::Int(1), Value::Int(2)]));
    let _q = factory.proxy(Value::list(vec![]));
    for _ in 0..3 {
        ops::len(&p).unwrap();
    }
    ops::repr(&p).unwrap();

    let report = profiler.lock().unwrap().report();
    assert_eq!(report.total_dispatches, 4);
    assert_eq!(report.op_counts[0], (Op::Len, 3));
    assert_eq!(report.resolution_counts, [(Resolution::Forwarded, 4)]);
    assert_eq!(report.syntheses, 1);
    assert_eq!(report.cache_hits, 1);
    assert_eq!(report.max_depth, 1);
    assert!(report.to_string().contains("Total dispatches:   4"));
}

#[test]
fn recorder_limit_caps_events() {
    let recorder = Arc::new(Mutex::new(RecordingTracer::with_limit(2)));
    let factory = ProxyFactory::with_tracer(ProxyConfig::default(), Arc::clone(&recorder));
    let p = factory.proxy(Value::Int(1));
    for _ in 0..5 {
        ops::repr(&p).unwrap();
    }
    assert_eq!(recorder.lock().unwrap().event_count(), 2);
}

#[test]
fn config_from_json() {
    let config = ProxyConfig::from_json(r#"{"max_dispatch_depth": 4}"#).unwrap();
    assert_eq!(config, ProxyConfig::new().max_dispatch_depth(Some(4)));

    let config = ProxyConfig::from_json(r#"{"max_dispatch_depth": null, "mirror_legacy": false}"#).unwrap();
    assert_eq!(config.max_dispatch_depth, None);
    assert!(!config.mirror_legacy);

    let round = ProxyConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(round, config);

    let err = ProxyConfig::from_json(r#"{"max_dispatch_depth": "deep"}"#).unwrap_err();
    assert!(err.to_string().starts_with("invalid proxy config: "));
}
