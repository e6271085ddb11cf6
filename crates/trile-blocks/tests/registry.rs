use trile_blocks::config::{BlockDef, BlocksConfig};
use trile_blocks::{ActorType, BlockRegistry, Classification, RegistryError};
use proptest::prelude::*;

#[test]
fn toml_definitions_compile_classification() {
    let reg = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "stone"

        [[blocks]]
        name = "vine"
        actor = "vine"

        [[blocks]]
        name = "glass"
        seethrough = true

        [[blocks]]
        name = "door"
        actor = "door"

        [[blocks]]
        name = "hole"
        actor = "hole"

        [[blocks]]
        name = "ghost"
        immaterial = true
    "#,
    )
    .unwrap();
    assert_eq!(reg.len(), 6);
    let class = |n: &str| reg.by_name(n).unwrap().classification;
    assert_eq!(class("stone"), Classification::Solid);
    assert_eq!(class("vine"), Classification::Overlapable);
    assert_eq!(class("glass"), Classification::Thin);
    assert_eq!(class("door"), Classification::Thin);
    assert_eq!(class("hole"), Classification::Immaterial);
    assert_eq!(class("ghost"), Classification::Immaterial);
    assert!(reg.by_name("stone").unwrap().occludes());
    assert!(!reg.by_name("glass").unwrap().occludes());
}

#[test]
fn ids_default_to_next_free_slot() {
    let mut reg = BlockRegistry::new();
    let a = reg
        .register(BlockDef {
            name: "a".into(),
            id: Some(1),
            ..Default::default()
        })
        .unwrap();
    let b = reg
        .register(BlockDef {
            name: "b".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(a, 1);
    assert_eq!(b, 0);
    assert_eq!(reg.id_by_name("b"), Some(0));
}

#[test]
fn duplicates_are_rejected() {
    let cfg = BlocksConfig {
        blocks: vec![
            BlockDef {
                name: "a".into(),
                id: Some(2),
                ..Default::default()
            },
            BlockDef {
                name: "a".into(),
                ..Default::default()
            },
        ],
    };
    assert_eq!(
        BlockRegistry::from_config(cfg).unwrap_err(),
        RegistryError::DuplicateName("a".into())
    );

    let cfg = BlocksConfig {
        blocks: vec![
            BlockDef {
                name: "a".into(),
                id: Some(2),
                ..Default::default()
            },
            BlockDef {
                name: "b".into(),
                id: Some(2),
                ..Default::default()
            },
        ],
    };
    assert_eq!(
        BlockRegistry::from_config(cfg).unwrap_err(),
        RegistryError::DuplicateId(2)
    );
}

#[test]
fn unknown_ids_are_immaterial() {
    let reg = BlockRegistry::new();
    assert_eq!(reg.classification(42), Classification::Immaterial);
}

fn arb_actor() -> impl Strategy<Value = ActorType> {
    prop_oneof![
        Just(ActorType::None),
        Just(ActorType::Ladder),
        Just(ActorType::Vine),
        Just(ActorType::Sign),
        Just(ActorType::Door),
        Just(ActorType::Fence),
        Just(ActorType::Hole),
        Just(ActorType::Water),
        Just(ActorType::Checkpoint),
        Just(ActorType::Pickup),
        Just(ActorType::Crystal),
        Just(ActorType::Bomb),
        Just(ActorType::PushSwitch),
        Just(ActorType::Spring),
    ]
}

proptest! {
    // Explicit immaterial always wins, and only solid blocks are opaque
    #[test]
    fn classification_flags_are_consistent(
        actor in arb_actor(),
        immaterial in proptest::option::of(any::<bool>()),
        thin in proptest::option::of(any::<bool>()),
        seethrough in any::<bool>(),
    ) {
        let mut reg = BlockRegistry::new();
        let id = reg.register(BlockDef {
            name: "t".into(),
            actor: Some(actor),
            immaterial,
            thin,
            seethrough: Some(seethrough),
            ..Default::default()
        }).unwrap();
        let ty = reg.get(id).unwrap();
        if immaterial == Some(true) {
            prop_assert_eq!(ty.classification, Classification::Immaterial);
        }
        prop_assert_eq!(ty.classification.is_opaque(), ty.classification == Classification::Solid);
        prop_assert!(!ty.occludes() || !seethrough);
        if ty.classification.is_opaque() {
            prop_assert!(ty.classification.is_surface());
        }
    }
}
