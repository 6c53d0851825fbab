use pretty_assertions::assert_eq;

use crate::test_helpers::CoreLib;
use crate::{TypeMembersBuilder, WellKnownType};

#[test]
fn reference_arguments_become_canon() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let canon = lib.canon_type();
    let list_canon = lib.get_instantiated_type(list, &[canon]);

    assert_eq!(
        lib.convert_to_canon_form(lib.get_instantiated_type(list, &[lib.string()])),
        list_canon
    );
    assert_eq!(
        lib.convert_to_canon_form(lib.get_instantiated_type(list, &[lib.object()])),
        list_canon
    );
    assert_eq!(
        lib.convert_to_canon_form(
            lib.get_instantiated_type(list, &[lib.get_array_type(lib.int32())])
        ),
        list_canon
    );
}

#[test]
fn value_type_arguments_keep_identity() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let list_int = lib.get_instantiated_type(list, &[lib.int32()]);

    assert_eq!(lib.convert_to_canon_form(list_int), list_int);
    assert!(lib.is_canonical(list_int));
}

#[test]
fn generic_value_type_arguments_are_canonicalized_inside() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let nullable = lib.known(WellKnownType::Nullable);
    let canon = lib.canon_type();

    let nullable_string = lib.get_instantiated_type(nullable, &[lib.string()]);
    let list_nullable_string = lib.get_instantiated_type(list, &[nullable_string]);
    assert_eq!(
        lib.convert_to_canon_form(list_nullable_string),
        lib.get_instantiated_type(list, &[lib.get_instantiated_type(nullable, &[canon])])
    );

    let pair = lib.define(
        lib.builder("Pair`2")
            .with_base(lib.known(WellKnownType::ValueType))
            .with_generic_arity(2),
        TypeMembersBuilder::new(),
    );
    let pair_string_int = lib.get_instantiated_type(pair, &[lib.string(), lib.int32()]);
    assert_eq!(
        lib.convert_to_canon_form(lib.get_instantiated_type(list, &[pair_string_int])),
        lib.get_instantiated_type(
            list,
            &[lib.get_instantiated_type(pair, &[canon, lib.int32()])]
        )
    );
}

#[test]
fn parameterized_types_canonicalize_their_parameter() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let canon = lib.canon_type();
    let list_string = lib.get_instantiated_type(list, &[lib.string()]);

    assert_eq!(lib.convert_to_canon_form(lib.get_array_type(lib.string())), lib.get_array_type(canon));
    assert_eq!(lib.convert_to_canon_form(lib.get_array_type(list_string)), lib.get_array_type(canon));
    assert_eq!(
        lib.convert_to_canon_form(lib.get_md_array_type(lib.string(), 2)),
        lib.get_md_array_type(canon, 2)
    );
    assert_eq!(
        lib.convert_to_canon_form(lib.get_by_ref_type(lib.string())),
        lib.get_by_ref_type(canon)
    );

    let int_array = lib.get_array_type(lib.int32());
    let int_pointer = lib.get_pointer_type(lib.int32());
    assert_eq!(lib.convert_to_canon_form(int_array), int_array);
    assert_eq!(lib.convert_to_canon_form(int_pointer), int_pointer);
}

#[test]
fn types_with_nothing_to_share_are_their_own_form() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let open = lib.get_instantiated_type(list, &[lib.t(0)]);

    for ty in [list, open, lib.string(), lib.int32(), lib.t(0), lib.canon_type()] {
        assert_eq!(lib.convert_to_canon_form(ty), ty, "{}", lib.type_name(ty));
    }
}

#[test]
fn canon_predicates() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let list_canon = lib.get_instantiated_type(list, &[lib.canon_type()]);
    let list_string = lib.get_instantiated_type(list, &[lib.string()]);

    assert!(lib.is_canon_type(lib.canon_type()));
    assert!(!lib.is_canon_type(lib.object()));
    assert!(lib.is_canonical(list_canon));
    assert!(!lib.is_canonical(list_string));
    assert_eq!(lib.convert_to_canon_form(list_canon), list_canon);
}
