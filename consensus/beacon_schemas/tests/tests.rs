use beacon_schemas::*;
use logging::test_logger;
use quickcheck_macros::quickcheck;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn codec() -> SszCodec {
    SszCodec::new(
        Arc::new(SchemaRegistry::beacon_block_catalog().expect("catalog should load")),
        test_logger(),
    )
}

fn proposal(slot: u64, root_byte: u8) -> Value {
    Value::record(vec![
        ("slot", Value::uint(slot)),
        ("shard", Value::uint(0)),
        ("blockRoot", Value::bytes(vec![root_byte; 32])),
    ])
}

fn attestation_data(slot: u64) -> Value {
    Value::record(vec![
        ("slot", Value::uint(slot)),
        ("shard", Value::uint(3)),
        ("beaconBlockRoot", Value::bytes(vec![1; 32])),
        ("epochBoundaryRoot", Value::bytes(vec![2; 32])),
        ("shardBlockRoot", Value::bytes(vec![3; 32])),
        (
            "latestCrosslink",
            Value::record(vec![
                ("epoch", Value::uint(slot / 64)),
                ("shardBlockRoot", Value::bytes(vec![4; 32])),
            ]),
        ),
        ("justifiedEpoch", Value::uint(1)),
        ("justifiedBlockRoot", Value::bytes(vec![5; 32])),
    ])
}

fn slashable_attestation(indices: &[u64]) -> Value {
    Value::record(vec![
        (
            "validatorIndices",
            Value::list(indices.iter().copied().map(Value::uint)),
        ),
        ("data", attestation_data(10)),
        ("custodyBitfield", Value::bytes(vec![0b0100_0000])),
        ("aggregateSignature", Value::bytes(vec![0xee; 96])),
    ])
}

fn beacon_block() -> Value {
    let codec = codec();
    let deposit = {
        let mut deposit = codec.default_value("Deposit").unwrap();
        if let Value::Record(fields) = &mut deposit {
            fields.insert(
                "branch".into(),
                Value::list(vec![Value::bytes(vec![7; 32]), Value::bytes(vec![8; 32])]),
            );
            fields.insert("index".into(), Value::uint(42));
        }
        deposit
    };

    Value::record(vec![
        ("slot", Value::uint(100)),
        ("parentRoot", Value::bytes(vec![0xaa; 32])),
        ("stateRoot", Value::bytes(vec![0xbb; 32])),
        ("randaoReveal", Value::bytes(vec![0xcc; 96])),
        (
            "eth1Data",
            Value::record(vec![
                ("depositRoot", Value::bytes(vec![0xdd; 32])),
                ("blockHash", Value::bytes(vec![0xde; 32])),
            ]),
        ),
        ("signature", Value::bytes(vec![0xff; 96])),
        (
            "body",
            Value::record(vec![
                (
                    "proposerSlashings",
                    Value::list(vec![Value::record(vec![
                        ("proposerIndex", Value::uint(9)),
                        ("proposalData1", proposal(99, 1)),
                        ("proposalSignature1", Value::bytes(vec![1; 96])),
                        ("proposalData2", proposal(99, 2)),
                        ("proposalSignature2", Value::bytes(vec![2; 96])),
                    ])]),
                ),
                (
                    "attesterSlashings",
                    Value::list(vec![Value::record(vec![
                        ("slashableAttestation1", slashable_attestation(&[1, 2, 3])),
                        ("slashableAttestation2", slashable_attestation(&[2])),
                    ])]),
                ),
                (
                    "attestations",
                    Value::list((0..3).map(|i| {
                        Value::record(vec![
                            ("aggregationBitfield", Value::bytes(vec![0xf0; i + 1])),
                            ("data", attestation_data(96 + i as u64)),
                            ("custodyBitfield", Value::bytes(vec![])),
                            ("aggregateSignature", Value::bytes(vec![0x11; 96])),
                        ])
                    })),
                ),
                ("deposits", Value::list(vec![deposit])),
                (
                    "voluntaryExits",
                    Value::list(vec![Value::record(vec![
                        ("epoch", Value::uint(2)),
                        ("validatorIndex", Value::uint(17)),
                        ("signature", Value::bytes(vec![0x22; 96])),
                    ])]),
                ),
                (
                    "transfers",
                    Value::list(vec![codec.default_value("Transfer").unwrap()]),
                ),
            ]),
        ),
    ])
}

#[test]
fn populated_beacon_block_round_trip() {
    let codec = codec();
    let block = beacon_block();

    let bytes = codec.encode("BeaconBlock", &block).unwrap();
    let descriptor = codec.descriptor("BeaconBlock").unwrap();

    assert_eq!(ssz_schema::encoded_len(descriptor, &block), Ok(bytes.len()));
    assert_eq!(codec.decode("BeaconBlock", &bytes), Ok(block));
}

#[test]
fn beacon_block_header_layout() {
    let codec = codec();
    let bytes = codec.encode("BeaconBlock", &beacon_block()).unwrap();

    // slot | parentRoot | stateRoot | randaoReveal | eth1Data | signature | offset of body
    let fixed_part_len = 8 + 32 + 32 + 96 + 64 + 96 + 4;

    assert_eq!(&bytes[0..8], &hex::decode("6400000000000000").unwrap()[..]);
    assert_eq!(&bytes[8..40], &[0xaa; 32][..]);
    assert_eq!(
        &bytes[fixed_part_len - 4..fixed_part_len],
        &(fixed_part_len as u32).to_le_bytes()[..]
    );
}

#[test]
fn default_block_round_trip() {
    let codec = codec();

    for name in codec.registry().names() {
        let value = codec.default_value(name).unwrap();
        let bytes = codec.encode(name, &value).unwrap();

        assert_eq!(codec.decode(name, &bytes), Ok(value), "{}", name);
    }
}

#[test]
fn decode_error_path_through_block() {
    let codec = codec();
    let mut bytes = codec.encode("BeaconBlock", &beacon_block()).unwrap();

    // The final transfer loses its last byte.
    bytes.pop();

    match codec.decode("BeaconBlock", &bytes) {
        Err(Error::Decode(e)) => {
            assert_eq!(e.path(), "body.transfers");
            assert_eq!(
                e.root_cause(),
                &DecodeError::Framing {
                    remaining: 183,
                    element_len: 184
                }
            );
        }
        other => panic!("expected a decode error, got {:?}", other),
    }
}

#[test]
fn catalog_body_lists_are_unbounded() {
    let codec = codec();
    let mut body = codec.default_value("BeaconBlockBody").unwrap();

    if let Value::Record(fields) = &mut body {
        fields.insert(
            "deposits".into(),
            Value::list(vec![codec.default_value("Deposit").unwrap(); 17]),
        );
        fields.insert(
            "attesterSlashings".into(),
            Value::list(vec![codec.default_value("AttesterSlashing").unwrap(); 2]),
        );
    }

    let bytes = codec.encode("BeaconBlockBody", &body).unwrap();
    assert_eq!(codec.decode("BeaconBlockBody", &bytes), Ok(body));
}

#[test]
fn bounded_list_from_schema_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capped.yaml");

    fs::write(
        &path,
        r#"
- name: CappedBody
  fields:
    - [slot, uint64]
    - [deposits, {list: Deposit, max_len: 16}]
"#,
    )
    .unwrap();

    let config = RegistryConfig {
        include_builtin: true,
        schema_files: vec![path],
    };
    let registry = SchemaRegistry::from_config(&config, &test_logger()).unwrap();
    let codec = SszCodec::new(Arc::new(registry), test_logger());

    let capped = |n: usize| {
        Value::record(vec![
            ("slot", Value::uint(1)),
            (
                "deposits",
                Value::list(vec![codec.default_value("Deposit").unwrap(); n]),
            ),
        ])
    };

    let bytes = codec.encode("CappedBody", &capped(16)).unwrap();
    assert_eq!(codec.decode("CappedBody", &bytes), Ok(capped(16)));

    match codec.encode("CappedBody", &capped(17)) {
        Err(Error::Encode(e)) => {
            assert_eq!(e.path(), "deposits");
            assert_eq!(
                e.root_cause(),
                &EncodeError::ListTooLong {
                    len: 17,
                    max_len: 16
                }
            );
        }
        other => panic!("expected an encode error, got {:?}", other),
    }
}

#[test]
fn codec_with_terminal_logger() {
    let log = logging::build_logger(&logging::LoggerConfig {
        compact: true,
        ..logging::LoggerConfig::default()
    })
    .unwrap();
    let codec = SszCodec::new(
        Arc::new(SchemaRegistry::beacon_block_catalog().unwrap()),
        log,
    );

    let block = beacon_block();
    let bytes = codec.encode("BeaconBlock", &block).unwrap();
    assert_eq!(codec.decode("BeaconBlock", &bytes), Ok(block));
}

#[test]
fn json_dump() {
    let codec = codec();
    let exit = Value::record(vec![
        ("epoch", Value::uint(2)),
        ("validatorIndex", Value::uint(17)),
        ("signature", Value::bytes(vec![0; 2])),
    ]);

    assert_eq!(
        serde_json::to_string(&exit).unwrap(),
        r#"{"epoch":"2","signature":"0x0000","validatorIndex":"17"}"#
    );

    let committee = codec
        .decode(
            "CrosslinkCommittee",
            &hex::decode("05000000000000000c0000000100000000000000").unwrap(),
        )
        .unwrap();

    assert_eq!(
        serde_json::to_value(&committee).unwrap(),
        serde_json::json!({"shard": "5", "validatorIndices": ["1"]})
    );
}

#[test]
fn registry_from_config_with_extra_file() {
    let dir = tempdir().unwrap();
    let shard_path = dir.path().join("shard.yaml");

    fs::write(
        &shard_path,
        r#"
- name: ShardBlock
  fields:
    - [slot, uint64]
    - [shard, uint64]
    - [parentRoot, bytes32]
    - [beaconChainRef, ProposalSignedData]
    - [body, {list: uint8, max_len: 16384}]
"#,
    )
    .unwrap();

    let config_path = dir.path().join("registry.yaml");
    fs::write(
        &config_path,
        format!("schema_files:\n  - {}\n", shard_path.display()),
    )
    .unwrap();

    let config = RegistryConfig::from_file(&config_path).unwrap();
    assert!(config.include_builtin);

    let registry = SchemaRegistry::from_config(&config, &test_logger()).unwrap();
    assert_eq!(registry.len(), 17);

    let codec = SszCodec::new(Arc::new(registry), test_logger());
    let shard_block = Value::record(vec![
        ("slot", Value::uint(1)),
        ("shard", Value::uint(2)),
        ("parentRoot", Value::bytes(vec![3; 32])),
        ("beaconChainRef", proposal(0, 9)),
        ("body", Value::bytes(vec![1, 2, 3])),
    ]);

    let bytes = codec.encode("ShardBlock", &shard_block).unwrap();
    assert_eq!(bytes.len(), 8 + 8 + 32 + 48 + 4 + 3);
    assert_eq!(codec.decode("ShardBlock", &bytes), Ok(shard_block));
}

#[test]
fn registry_without_builtin() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shard.yaml");
    fs::write(&path, "- name: A\n  fields: [[x, ProposalSignedData]]\n").unwrap();

    let config = RegistryConfig {
        include_builtin: false,
        schema_files: vec![path],
    };

    assert_eq!(
        SchemaRegistry::from_config(&config, &test_logger()),
        Err(Error::Registry(RegistryError::UnknownType {
            record: "A".into(),
            field: "x".into(),
            type_name: "ProposalSignedData".into()
        }))
    );
}

#[test]
fn registry_file_cannot_redefine_builtin() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deposit.yaml");
    fs::write(&path, "- name: Deposit\n  fields: [[index, uint64]]\n").unwrap();

    let config = RegistryConfig {
        include_builtin: true,
        schema_files: vec![path],
    };

    assert_eq!(
        SchemaRegistry::from_config(&config, &test_logger()),
        Err(Error::Registry(RegistryError::DuplicateType(
            "Deposit".into()
        )))
    );
}

#[test]
fn registry_file_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "- name: A\n  fields: not-a-list\n").unwrap();

    assert!(matches!(
        load_definitions(&path),
        Err(Error::UnableToParseYaml(_))
    ));
    assert!(matches!(
        load_definitions(dir.path().join("missing.yaml")),
        Err(Error::UnableToReadFile(_))
    ));
}

#[quickcheck]
fn quickcheck_committee_round_trip(shard: u64, indices: Vec<u64>) -> bool {
    let codec = codec();
    let committee = Value::record(vec![
        ("shard", Value::uint(shard)),
        (
            "validatorIndices",
            Value::list(indices.iter().copied().map(Value::uint)),
        ),
    ]);

    let bytes = codec.encode("CrosslinkCommittee", &committee).unwrap();

    bytes.len() == 12 + 8 * indices.len()
        && codec.decode("CrosslinkCommittee", &bytes) == Ok(committee)
}

#[quickcheck]
fn quickcheck_transfer_round_trip(fields: (u64, u64, u64, u64, u64), pubkey_byte: u8) -> bool {
    let codec = codec();
    let (from, to, amount, fee, slot) = fields;
    let transfer = Value::record(vec![
        ("from", Value::uint(from)),
        ("to", Value::uint(to)),
        ("amount", Value::uint(amount)),
        ("fee", Value::uint(fee)),
        ("slot", Value::uint(slot)),
        ("pubkey", Value::bytes(vec![pubkey_byte; 48])),
        ("signature", Value::bytes(vec![0; 96])),
    ]);

    let bytes = codec.encode("Transfer", &transfer).unwrap();

    bytes.len() == 184 && codec.decode("Transfer", &bytes) == Ok(transfer)
}
