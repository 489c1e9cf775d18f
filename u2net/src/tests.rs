use crate::config::{StageConfig, U2NetConfig};
use crate::error::U2NetError;

/// The stages of the full-width model, ready to be altered.
fn full_rows() -> (Vec<StageConfig>, Vec<StageConfig>) {
    let config = U2NetConfig::full(1);
    (config.encode, config.decode)
}

#[test]
fn test_valid_configuration() {
    let config = U2NetConfig::full(1);
    assert!(config.validate().is_ok());
    assert_eq!(config.in_channels(), 3);
    assert_eq!(config.side_count(), 6);
}

#[test]
fn test_zero_out_channels() {
    let config = U2NetConfig::full(1).with_out_channels(0);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("out_channels"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_empty_encoder() {
    let config = U2NetConfig::from_rows(&[], &[], 1);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("encode"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_decoder_longer_than_skips() {
    let config = U2NetConfig::from_rows(
        &[(3, 3, 2, 4, false, false), (3, 4, 2, 4, false, true)],
        &[(3, 8, 2, 4, false, true), (3, 8, 2, 4, false, true)],
        1,
    );

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("skip features"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_encoder_channel_mismatch() {
    let (mut encode, decode) = full_rows();
    encode[2].in_channels = 100;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::ChannelMismatch {
            stage,
            expected,
            actual,
        }) => {
            assert_eq!(stage, "En3");
            assert_eq!(expected, 128);
            assert_eq!(actual, 100);
        }
        _ => panic!("Expected ChannelMismatch error"),
    }
}

#[test]
fn test_decoder_channel_mismatch() {
    let (encode, mut decode) = full_rows();
    decode[1].in_channels = 768;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::ChannelMismatch {
            stage,
            expected,
            actual,
        }) => {
            assert_eq!(stage, "De4");
            assert_eq!(expected, 1024);
            assert_eq!(actual, 768);
        }
        _ => panic!("Expected ChannelMismatch error"),
    }
}

#[test]
fn test_shallow_rsu_stage() {
    let (encode, mut decode) = full_rows();
    decode[4].height = 1;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::InvalidHeight { stage, height }) => {
            assert_eq!(stage, "De1");
            assert_eq!(height, 1);
        }
        _ => panic!("Expected InvalidHeight error"),
    }
}

#[test]
fn test_rsu4f_ignores_height() {
    let (mut encode, decode) = full_rows();
    encode[4].height = 0;
    let config = U2NetConfig::new(encode, decode);

    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_channel_stage() {
    let (mut encode, decode) = full_rows();
    encode[1].mid_channels = 0;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("En2"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_side_output_on_intermediate_encoder() {
    let (mut encode, decode) = full_rows();
    encode[3].side = true;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("En4"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_no_side_output() {
    let (mut encode, mut decode) = full_rows();
    encode[5].side = false;
    decode.iter_mut().for_each(|stage| stage.side = false);
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("at least one stage"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_detached_side_output() {
    let (encode, mut decode) = full_rows();
    decode[2].side = false;
    let config = U2NetConfig::new(encode, decode);

    match config.validate() {
        Err(U2NetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("De2"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_truncated_side_outputs_are_valid() {
    let (encode, mut decode) = full_rows();
    decode[3].side = false;
    decode[4].side = false;
    let config = U2NetConfig::new(encode, decode);

    assert!(config.validate().is_ok());
    assert_eq!(config.side_count(), 4);
}

#[test]
fn test_json_round_trip() {
    let config = U2NetConfig::prune_m(2);
    let parsed = U2NetConfig::from_json(&config.to_string()).unwrap();

    assert_eq!(parsed.encode, config.encode);
    assert_eq!(parsed.decode, config.decode);
    assert_eq!(parsed.out_channels, 2);
}

#[test]
fn test_json_hand_written() {
    let json = r#"{
        "encode": [
            {"height": 3, "in_channels": 3, "mid_channels": 2, "out_channels": 4, "rsu4f": false, "side": false},
            {"height": 4, "in_channels": 4, "mid_channels": 2, "out_channels": 4, "rsu4f": true, "side": true}
        ],
        "decode": [
            {"height": 3, "in_channels": 8, "mid_channels": 2, "out_channels": 4, "rsu4f": false, "side": true}
        ],
        "out_channels": 2
    }"#;

    let config = U2NetConfig::from_json(json).unwrap();
    assert_eq!(config.out_channels, 2);
    assert_eq!(config.side_count(), 2);
}

#[test]
fn test_json_missing_decode() {
    let json = r#"{"encode": [], "out_channels": 1}"#;

    match U2NetConfig::from_json(json) {
        Err(U2NetError::InvalidConfiguration { .. }) => {}
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_json_stage_missing_field() {
    let json = r#"{
        "encode": [{"height": 3, "in_channels": 3, "mid_channels": 2, "out_channels": 4, "rsu4f": false}],
        "decode": []
    }"#;

    match U2NetConfig::from_json(json) {
        Err(U2NetError::InvalidConfiguration { .. }) => {}
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_json_is_validated() {
    let mut config = U2NetConfig::full(1);
    config.decode[0].in_channels = 7;

    match U2NetConfig::from_json(&config.to_string()) {
        Err(U2NetError::ChannelMismatch { stage, .. }) => assert_eq!(stage, "De5"),
        _ => panic!("Expected ChannelMismatch error"),
    }
}

#[test]
fn test_stage_names() {
    let config = U2NetConfig::full(1);
    let names: Vec<String> = config.stages().map(|(name, _)| name).collect();

    assert_eq!(
        names,
        ["En1", "En2", "En3", "En4", "En5", "En6", "De5", "De4", "De3", "De2", "De1"]
    );
}
