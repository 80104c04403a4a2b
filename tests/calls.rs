use ferrous_container::{Args, CallKind, DiError, Dependency, Service, ServiceCollection};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Pet {
    name: String,
    age: u32,
    color: String,
    logger: Option<String>,
    language: String,
}

fn lines(err: &DiError) -> Vec<String> {
    err.collection().iter().map(|e| e.to_string()).collect()
}

#[test]
fn test_setter_and_wither_error_ordering() {
    let mut services = ServiceCollection::new();
    services.add_service(
        "pet",
        Service::with_value(Pet::default())
            .append_call(
                "SetName",
                vec![Dependency::fallible_provider(|| Err::<String, _>("name provider failed"))],
                |p: &mut Pet, args: &Args| -> Result<(), DiError> {
                    p.name = args.value::<String>(0)?;
                    Ok(())
                },
            )
            .append_call("SetAge", vec![], |_: &mut Pet, _: &Args| Err::<(), _>("age rejected"))
            .append_call("SetColor", vec![], |_: &mut Pet, _: &Args| Err::<(), _>("color rejected"))
            .append_wither("WithLogger", vec![], |_: Pet, _: &Args| Err::<Pet, _>("logger unavailable"))
            .append_call("SetLanguage", vec![], |p: &mut Pet, _: &Args| -> Result<(), DiError> {
                p.language = "en".into();
                Ok(())
            }),
    );
    let container = services.build();

    let err = container.get("pet").unwrap_err();
    assert_eq!(
        lines(&err),
        vec![
            "Container.get(\"pet\"): resolve args \"SetName\": arg #0: name provider failed",
            "Container.get(\"pet\"): call \"SetAge\": age rejected",
            "Container.get(\"pet\"): call \"SetColor\": color rejected",
            "Container.get(\"pet\"): wither \"WithLogger\": logger unavailable",
        ]
    );
}

#[test]
fn test_wither_argument_error_stops_the_build() {
    let mut services = ServiceCollection::new();
    services.add_service(
        "pet",
        Service::with_value(Pet::default())
            .append_wither("WithLogger", vec![Dependency::service("logger")], |p: Pet, _: &Args| {
                Ok::<_, DiError>(p)
            })
            .append_call("SetAge", vec![], |_: &mut Pet, _: &Args| Err::<(), _>("never reached")),
    );
    let err = services.build().get("pet").unwrap_err();
    assert_eq!(
        lines(&err),
        vec!["Container.get(\"pet\"): resolve args \"WithLogger\": arg #0: Container.get(\"logger\"): service does not exist"]
    );
}

#[test]
fn test_calls_apply_in_order() {
    let mut services = ServiceCollection::new();
    services
        .add_service("logger", Service::with_value(String::from("stderr")))
        .add_service(
            "pet",
            Service::with_value(Pet::default())
                .append_call("SetAge", vec![Dependency::value(3u32)], |p: &mut Pet, args: &Args| {
                    p.age = args.value::<u32>(0)?;
                    Ok::<_, DiError>(())
                })
                .append_wither("WithLogger", vec![Dependency::service("logger")], |p: Pet, args: &Args| {
                    let logger = args.value::<String>(0)?;
                    Ok::<_, DiError>(Pet {
                        logger: Some(logger),
                        ..p
                    })
                })
                .append_call("SetColor", vec![], |p: &mut Pet, _: &Args| {
                    p.color = format!("{} years of grey", p.age);
                    Ok::<_, DiError>(())
                }),
        );
    let pet = services.build().get_as::<Pet>("pet").unwrap();
    assert_eq!(pet.age, 3);
    assert_eq!(pet.logger.as_deref(), Some("stderr"));
    assert_eq!(pet.color, "3 years of grey");
}

#[test]
fn test_wither_may_change_the_service_type() {
    #[derive(Debug)]
    struct Named(String);

    let mut services = ServiceCollection::new();
    services.add_service(
        "named",
        Service::with_value(Pet {
            name: "Rex".into(),
            ..Pet::default()
        })
        .append_wither("IntoNamed", vec![], |p: Pet, _: &Args| Ok::<_, DiError>(Named(p.name))),
    );
    let named = services.build().get_as::<Named>("named").unwrap();
    assert_eq!(named.0, "Rex");
}

#[test]
fn test_call_names() {
    let service = Service::new()
        .append_call("SetA", vec![], |_: &mut (), _: &Args| Ok::<_, DiError>(()))
        .append_wither("WithB", vec![], |u: (), _: &Args| Ok::<_, DiError>(u));
    assert_eq!(
        service.call_names(),
        vec![("SetA", CallKind::Setter), ("WithB", CallKind::Wither)]
    );
}

#[test]
fn test_setter_receives_tagged_list() {
    let mut services = ServiceCollection::new();
    services
        .add_service("en", Service::with_value(String::from("en")).set_tag("lang", 1))
        .add_service("fr", Service::with_value(String::from("fr")).set_tag("lang", 2))
        .add_service(
            "pet",
            Service::with_value(Pet::default()).append_call(
                "SetLanguage",
                vec![Dependency::tag("lang")],
                |p: &mut Pet, args: &Args| {
                    let langs = args.get::<Vec<Arc<String>>>(0)?;
                    p.language = langs.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(",");
                    Ok::<_, DiError>(())
                },
            ),
        );
    let pet = services.build().get_as::<Pet>("pet").unwrap();
    assert_eq!(pet.language, "fr,en");
}
