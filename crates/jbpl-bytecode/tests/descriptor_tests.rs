use jbpl_bytecode::{ClassVersion, InsnNode, MethodDescriptor, Opcode, TypeDescriptor};
use pretty_assertions::assert_eq;

#[test]
fn type_descriptor_round_trips_through_text() {
    let descriptor: TypeDescriptor = "[[Ljava/lang/String;".parse().unwrap();
    assert_eq!(
        descriptor,
        TypeDescriptor::array(TypeDescriptor::array(TypeDescriptor::object(
            "java/lang/String"
        )))
    );
    assert_eq!(descriptor.to_string(), "[[Ljava/lang/String;");
}

#[test]
fn method_descriptor_parses_params_and_return() {
    let descriptor: MethodDescriptor = "(IJLjava/lang/Object;[Z)V".parse().unwrap();
    assert_eq!(
        descriptor.params,
        vec![
            TypeDescriptor::Int,
            TypeDescriptor::Long,
            TypeDescriptor::object("java/lang/Object"),
            TypeDescriptor::array(TypeDescriptor::Boolean),
        ]
    );
    assert_eq!(descriptor.return_type, TypeDescriptor::Void);
    assert_eq!(descriptor.params_slot_size(), 5);
}

#[test]
fn malformed_descriptors_are_rejected() {
    assert!("Ljava/lang/String".parse::<TypeDescriptor>().is_err());
    assert!("II".parse::<TypeDescriptor>().is_err());
    assert!("(I".parse::<MethodDescriptor>().is_err());
}

#[test]
fn class_versions_accept_release_and_major_numbers() {
    assert_eq!(ClassVersion::from_number(8).unwrap(), ClassVersion::V1_8);
    assert_eq!(ClassVersion::from_number(61).unwrap(), ClassVersion::V17);
    assert_eq!(ClassVersion::V1_1.minor(), 3);
    assert_eq!(ClassVersion::V25.major(), 69);
    assert!(ClassVersion::from_number(70).is_err());
    assert!(ClassVersion::from_number(0).is_err());
}

#[test]
fn node_validation_checks_opcode_shape() {
    let good = InsnNode::Var {
        opcode: Opcode::ILOAD,
        slot: 1,
    };
    assert!(good.validate().is_ok());
    let bad = InsnNode::Var {
        opcode: Opcode::IADD,
        slot: 1,
    };
    assert!(bad.validate().is_err());
}
