//! Generates Rust types from sns.proto.
//!
//! Uses protoc when available. In environments without protoc, falls back to
//! a hand-built FileDescriptorSet equivalent to sns.proto (kept in sync with
//! the .proto by hand) and runs prost/tonic codegen from it via
//! `skip_protoc_run`.

use std::path::PathBuf;

use prost::Message as _;
use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MethodDescriptorProto, ServiceDescriptorProto,
};

fn json_name(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn field(
    name: &str,
    number: i32,
    ty: Type,
    type_name: Option<&str>,
    repeated: bool,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(if repeated { Label::Repeated } else { Label::Optional } as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(|s| s.to_string()),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
    field(name, number, Type::String, None, false)
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn enum_desc(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .map(|(n, num)| EnumValueDescriptorProto {
                name: Some(n.to_string()),
                number: Some(*num),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn method(
    name: &str,
    input: &str,
    output: &str,
    client_streaming: bool,
    server_streaming: bool,
) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        client_streaming: Some(client_streaming),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![message(
            "Timestamp",
            vec![
                field("seconds", 1, Type::Int64, None, false),
                field("nanos", 2, Type::Int32, None, false),
            ],
        )],
        ..Default::default()
    }
}

fn sns_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("sns.proto".to_string()),
        package: Some("sns".to_string()),
        syntax: Some("proto3".to_string()),
        dependency: vec!["google/protobuf/timestamp.proto".to_string()],
        message_type: vec![
            message("LoginRequest", vec![string_field("username", 1)]),
            message(
                "LoginReply",
                vec![
                    field("status", 1, Type::Enum, Some(".sns.LoginStatus"), false),
                    string_field("message", 2),
                ],
            ),
            message(
                "FollowRequest",
                vec![string_field("username", 1), string_field("target", 2)],
            ),
            message(
                "FollowReply",
                vec![
                    field("status", 1, Type::Enum, Some(".sns.FollowStatus"), false),
                    string_field("message", 2),
                ],
            ),
            message(
                "UnFollowRequest",
                vec![string_field("username", 1), string_field("target", 2)],
            ),
            message(
                "UnFollowReply",
                vec![
                    field("status", 1, Type::Enum, Some(".sns.UnFollowStatus"), false),
                    string_field("message", 2),
                ],
            ),
            message("ListRequest", vec![string_field("username", 1)]),
            message(
                "ListReply",
                vec![
                    field("all_users", 1, Type::String, None, true),
                    field("followers", 2, Type::String, None, true),
                ],
            ),
            message(
                "Post",
                vec![
                    string_field("author", 1),
                    string_field("text", 2),
                    field(
                        "timestamp",
                        3,
                        Type::Message,
                        Some(".google.protobuf.Timestamp"),
                        false,
                    ),
                ],
            ),
        ],
        enum_type: vec![
            enum_desc(
                "LoginStatus",
                &[
                    ("LOGIN_STATUS_UNSPECIFIED", 0),
                    ("LOGIN_STATUS_SUCCESS", 1),
                    ("LOGIN_STATUS_ALREADY_JOINED", 2),
                ],
            ),
            enum_desc(
                "FollowStatus",
                &[
                    ("FOLLOW_STATUS_UNSPECIFIED", 0),
                    ("FOLLOW_STATUS_SUCCESS", 1),
                    ("FOLLOW_STATUS_INVALID_TARGET", 2),
                    ("FOLLOW_STATUS_SELF_FOLLOW", 3),
                    ("FOLLOW_STATUS_ALREADY_FOLLOWING", 4),
                ],
            ),
            enum_desc(
                "UnFollowStatus",
                &[
                    ("UN_FOLLOW_STATUS_UNSPECIFIED", 0),
                    ("UN_FOLLOW_STATUS_SUCCESS", 1),
                    ("UN_FOLLOW_STATUS_INVALID_TARGET", 2),
                    ("UN_FOLLOW_STATUS_NOT_FOLLOWING", 3),
                ],
            ),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("SnsService".to_string()),
            method: vec![
                method("Login", ".sns.LoginRequest", ".sns.LoginReply", false, false),
                method("Follow", ".sns.FollowRequest", ".sns.FollowReply", false, false),
                method(
                    "UnFollow",
                    ".sns.UnFollowRequest",
                    ".sns.UnFollowReply",
                    false,
                    false,
                ),
                method("List", ".sns.ListRequest", ".sns.ListReply", false, false),
                method("Timeline", ".sns.Post", ".sns.Post", true, true),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn protoc_available() -> bool {
    let protoc = std::env::var_os("PROTOC").unwrap_or_else(|| "protoc".into());
    std::process::Command::new(protoc)
        .arg("--version")
        .output()
        .is_ok()
}

fn main() {
    println!("cargo:rerun-if-changed=sns.proto");

    let out_dir = PathBuf::from("src/generated");
    std::fs::create_dir_all(&out_dir).expect("Failed to create src/generated");
    let descriptor_path = out_dir.join("sns_descriptor.bin");

    let mut builder = tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .file_descriptor_set_path(&descriptor_path);

    if !protoc_available() {
        let fds = FileDescriptorSet {
            file: vec![timestamp_file(), sns_file()],
        };
        std::fs::write(&descriptor_path, fds.encode_to_vec())
            .expect("Failed to write descriptor set");
        builder = builder.skip_protoc_run();
    }

    builder
        .compile_protos(&["sns.proto"], &["."])
        .expect("Failed to compile proto files");
}
