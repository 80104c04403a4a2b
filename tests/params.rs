use ferrous_container::{
    Args, ConfigValue, Container, Dependency, MapParamSource, Provider, Service, ServiceCollection,
};
use std::sync::Arc;

#[test]
fn test_param_as_constructor_argument() {
    let mut services = ServiceCollection::new();
    services
        .add_param("port", Dependency::value(8080u16))
        .add_service(
            "addr",
            Service::with_constructor(
                Provider::fallible(|args: &Args| args.value::<u16>(0).map(|port| format!("0.0.0.0:{}", port))),
                vec![Dependency::param("port")],
            ),
        );
    let container = services.build();
    assert_eq!(container.get_as::<String>("addr").unwrap().as_str(), "0.0.0.0:8080");
}

#[test]
fn test_unknown_param() {
    let container = ServiceCollection::new().build();
    let err = container.get_param("ghost").unwrap_err();
    assert_eq!(err.to_string(), "getParam(\"ghost\"): param does not exist");
}

#[test]
fn test_override_param_flushes_chained_values() {
    let mut services = ServiceCollection::new();
    services
        .add_param("name", Dependency::value(String::from("Ann")))
        .add_param("alias", Dependency::param("name"));
    let container = services.build();
    assert_eq!(container.get_param_as::<String>("alias").unwrap().as_str(), "Ann");

    container.override_param("name", Dependency::value(String::from("Bea")));
    assert_eq!(container.get_param_as::<String>("alias").unwrap().as_str(), "Bea");
}

#[test]
#[should_panic(expected = "dependency of kind tag is not allowed")]
fn test_override_param_rejects_tags() {
    ServiceCollection::new().build().override_param("p", Dependency::tag("t"));
}

#[test]
#[should_panic(expected = "dependency of kind container is not allowed")]
fn test_add_param_rejects_container() {
    ServiceCollection::new().add_param("p", Dependency::Container);
}

#[test]
fn test_load_params_from_source() {
    let source = MapParamSource::new()
        .with("workers", ConfigValue::Integer(4))
        .with("debug", ConfigValue::Boolean(true))
        .with("tags", ConfigValue::Array(vec![ConfigValue::String("a".into())]));
    let container = Container::new();

    assert_eq!(container.load_params(&source), 3);
    assert_eq!(*container.get_param_as::<i64>("workers").unwrap(), 4);
    assert!(*container.get_param_as::<bool>("debug").unwrap());
    assert_eq!(
        *container.get_param_as::<ConfigValue>("tags").unwrap(),
        ConfigValue::Array(vec![ConfigValue::String("a".into())])
    );
}

#[test]
fn test_load_params_replaces_cached_values() {
    let mut services = ServiceCollection::new();
    services.add_param("workers", Dependency::value(1i64));
    let container = services.build();
    assert_eq!(*container.get_param_as::<i64>("workers").unwrap(), 1);

    container.load_params(&MapParamSource::new().with("workers", ConfigValue::Integer(8)));
    assert_eq!(*container.get_param_as::<i64>("workers").unwrap(), 8);
}

#[test]
fn test_params_are_shared_across_resolutions() {
    let mut services = ServiceCollection::new();
    services.add_param("list", Dependency::provider(|| vec![1u8, 2]));
    let container = services.build();
    let a: Arc<Vec<u8>> = container.get_param_as("list").unwrap();
    let b: Arc<Vec<u8>> = container.get_param_as("list").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[cfg(feature = "config")]
#[test]
fn test_params_from_json() {
    let source = MapParamSource::from_json(r#"{"db": {"host": "localhost"}, "pool": 16}"#).unwrap();
    let container = Container::new();
    container.load_params(&source);
    assert_eq!(*container.get_param_as::<i64>("pool").unwrap(), 16);
    let db = container.get_param_as::<ConfigValue>("db").unwrap();
    assert!(matches!(&*db, ConfigValue::Object(map) if map.len() == 1));
}
