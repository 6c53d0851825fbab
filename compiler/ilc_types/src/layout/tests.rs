use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::CoreLib;
use crate::{
    ClassLayout, FieldAttributes, FieldSpec, TargetArchitecture, TargetDetails,
    TypeDefinitionBuilder, TypeLoadReason, TypeMembersBuilder, WellKnownType,
};

fn offsets(lib: &CoreLib, ty: TypeId, names: &[&str]) -> Vec<u32> {
    names.iter().map(|name| lib.offset(ty, name)).collect()
}

fn load_reason(result: Result<InstanceLayout, LayoutError>) -> TypeLoadReason {
    match result {
        Err(LayoutError::TypeLoad { reason, .. }) => reason,
        other => panic!("expected a type load error, got {other:?}"),
    }
}

// ── Sequential layout ───────────────────────────────────────────

#[test]
fn sequential_class_follows_object_header() {
    let lib = CoreLib::new();
    let class1 = lib
        .define_type(
            lib.builder("Class1")
                .with_base(lib.object())
                .with_layout(ClassLayout::sequential()),
        )
        .unwrap();
    lib.complete_type(
        class1,
        TypeMembersBuilder::new()
            .field(FieldSpec::new("MyInt", lib.int32()))
            .field(FieldSpec::new("MyBool", lib.known(WellKnownType::Boolean)))
            .field(FieldSpec::new("MyChar", lib.known(WellKnownType::Char)))
            .field(FieldSpec::new("MyString", lib.string()))
            .field(FieldSpec::new(
                "MyByteArray",
                lib.get_array_type(lib.known(WellKnownType::Byte)),
            ))
            .field(FieldSpec::new("MyClass1SelfRef", class1)),
    )
    .unwrap();

    assert_eq!(
        offsets(
            &lib,
            class1,
            &["MyInt", "MyBool", "MyChar", "MyString", "MyByteArray", "MyClass1SelfRef"]
        ),
        vec![0x8, 0xC, 0xE, 0x10, 0x18, 0x20]
    );
    assert_eq!(lib.instance_byte_count(class1), Ok(0x28));
    assert_eq!(lib.instance_field_size(class1), Ok(8));
    assert_eq!(lib.instance_field_alignment(class1), Ok(8));

    let class2 = lib.laid_out(
        "Class2",
        class1,
        ClassLayout::sequential(),
        &[("MyInt2", lib.int32())],
    );
    assert_eq!(lib.offset(class2, "MyInt2"), 0x28);
    assert_eq!(lib.instance_byte_count(class2), Ok(0x30));
}

#[test]
fn struct_fields_pack_by_alignment() {
    let lib = CoreLib::new();
    let boolean = lib.known(WellKnownType::Boolean);
    let struct0 = lib.struct_(
        "Struct0",
        &[
            ("b1", boolean),
            ("b2", boolean),
            ("b3", boolean),
            ("i1", lib.int32()),
            ("s1", lib.string()),
        ],
    );
    let struct1 = lib.struct_("Struct1", &[("MyStruct0", struct0), ("MyBool", boolean)]);

    assert_eq!(
        offsets(&lib, struct0, &["b1", "b2", "b3", "i1", "s1"]),
        vec![0, 1, 2, 4, 8]
    );
    assert_eq!(lib.instance_field_size(struct0), Ok(0x10));
    assert_eq!(offsets(&lib, struct1, &["MyStruct0", "MyBool"]), vec![0, 0x10]);
    assert_eq!(lib.instance_field_size(struct1), Ok(0x18));
    assert_eq!(lib.instance_byte_count(struct1), Ok(0x18));
}

#[test]
fn derived_auto_classes_continue_after_unaligned_base() {
    let lib = CoreLib::new();
    let int = lib.int32();
    let string = lib.string();
    let char_ = lib.known(WellKnownType::Char);
    let boolean = lib.known(WellKnownType::Boolean);
    let tiny = lib.struct_("Tiny", &[("b", boolean)]);

    let class1 = lib.class(
        "AutoClass1",
        lib.object(),
        &[
            ("MyString", string),
            ("MyByteArray", lib.get_array_type(lib.known(WellKnownType::Byte))),
            ("MyObject", lib.object()),
            ("MyString2", string),
            ("MyInt", int),
            ("MyChar", char_),
            ("MyBool", boolean),
            ("MyByte", lib.known(WellKnownType::Byte)),
            ("MyTiny", tiny),
        ],
    );
    assert_eq!(lib.offset(class1, "MyTiny"), 48);
    assert_eq!(lib.instance_byte_count_unaligned(class1), Ok(49));

    let class2 = lib.class(
        "AutoClass2",
        class1,
        &[
            ("MyInt2", int),
            ("MyString3", string),
            ("MyChar2", char_),
            ("MyChar3", char_),
            ("MyBool2", boolean),
        ],
    );
    assert_eq!(
        offsets(&lib, class2, &["MyInt2", "MyString3", "MyChar2", "MyChar3", "MyBool2"]),
        vec![0x34, 0x38, 0x40, 0x42, 0x44]
    );
    assert_eq!(lib.instance_byte_count_unaligned(class2), Ok(69));
    assert_eq!(lib.instance_byte_count(class2), Ok(72));

    let class6 = lib.class("AutoClass6", class2, &[("MyInt6", int), ("MyChar6", char_)]);
    assert_eq!(offsets(&lib, class6, &["MyInt6", "MyChar6"]), vec![0x48, 0x4C]);
    assert_eq!(lib.instance_byte_count(class6), Ok(0x50));
}

#[test]
fn value_type_field_in_class_uses_struct_alignment() {
    let lib = CoreLib::new();
    let pair = lib.struct_("Pair", &[("Key", lib.string()), ("Value", lib.int32())]);
    let holder = lib.class("Holder", lib.object(), &[("Entry", pair), ("Tail", lib.int32())]);

    assert_eq!(lib.instance_field_size(pair), Ok(16));
    assert_eq!(offsets(&lib, holder, &["Entry", "Tail"]), vec![8, 24]);
}

#[test]
fn enum_is_laid_out_as_its_storage() {
    let lib = CoreLib::new();
    let color = lib.class(
        "Color",
        lib.known(WellKnownType::Enum),
        &[("value__", lib.known(WellKnownType::Byte))],
    );

    assert_eq!(lib.instance_field_size(color), Ok(1));
    assert_eq!(lib.offset(color, "value__"), 0);
}

#[test]
fn primitive_sizes_come_from_the_target() {
    let lib = CoreLib::new();
    let cases = [
        (WellKnownType::Boolean, 1),
        (WellKnownType::Char, 2),
        (WellKnownType::Int32, 4),
        (WellKnownType::Int64, 8),
        (WellKnownType::IntPtr, 8),
        (WellKnownType::Double, 8),
        (WellKnownType::Void, 8),
    ];
    for (well_known, size) in cases {
        let ty = lib.known(well_known);
        assert_eq!(lib.instance_field_size(ty), Ok(size), "{well_known:?}");
        assert_eq!(lib.instance_field_alignment(ty), Ok(size), "{well_known:?}");
    }
}

#[test]
fn empty_struct_occupies_one_byte() {
    let lib = CoreLib::new();
    let empty = lib.struct_("Empty", &[]);

    assert_eq!(lib.instance_field_size(empty), Ok(1));
    assert_eq!(lib.instance_byte_count_unaligned(empty), Ok(1));
    // Boxed instances are still object-aligned.
    assert_eq!(lib.instance_byte_count(empty), Ok(8));
}

// ── Packing and declared size ───────────────────────────────────

#[test]
fn declared_packing_caps_alignment() {
    let lib = CoreLib::new();
    let byte = lib.known(WellKnownType::Byte);
    let int = lib.int32();
    let value_type = lib.known(WellKnownType::ValueType);

    let packed1 = lib.laid_out(
        "Packed1",
        value_type,
        ClassLayout::sequential().with_packing(1),
        &[("B", byte), ("I", int)],
    );
    let packed2 = lib.laid_out(
        "Packed2",
        value_type,
        ClassLayout::sequential().with_packing(2),
        &[("B", byte), ("I", int)],
    );

    assert_eq!(lib.offset(packed1, "I"), 1);
    assert_eq!(lib.instance_field_size(packed1), Ok(5));
    assert_eq!(lib.offset(packed2, "I"), 2);
    assert_eq!(lib.instance_field_size(packed2), Ok(6));
}

#[test]
fn packing_is_ignored_with_gc_references() {
    let lib = CoreLib::new();
    let packed = lib.laid_out(
        "PackedRef",
        lib.known(WellKnownType::ValueType),
        ClassLayout::sequential().with_packing(1),
        &[("B", lib.known(WellKnownType::Byte)), ("S", lib.string())],
    );

    assert_eq!(lib.offset(packed, "S"), 8);
    assert_eq!(lib.instance_field_size(packed), Ok(16));
}

#[test]
fn declared_size_is_a_minimum_for_value_types() {
    let lib = CoreLib::new();
    let value_type = lib.known(WellKnownType::ValueType);
    let padded = lib.laid_out(
        "Padded",
        value_type,
        ClassLayout::sequential().with_size(16),
        &[("I", lib.int32())],
    );
    let small = lib.laid_out(
        "Small",
        value_type,
        ClassLayout::sequential().with_size(2),
        &[("I", lib.int32())],
    );

    assert_eq!(lib.instance_field_size(padded), Ok(16));
    assert_eq!(lib.instance_field_size(small), Ok(4));
}

// ── Explicit layout ─────────────────────────────────────────────

#[test]
fn explicit_offsets_follow_aligned_base() {
    let lib = CoreLib::new();
    let int = lib.int32();
    let explicit = lib.explicit(
        "ExplicitClass",
        lib.object(),
        ClassLayout::explicit(),
        &[("Bar", int, 4), ("Baz", lib.known(WellKnownType::Int16), 10)],
    );

    assert_eq!(offsets(&lib, explicit, &["Bar", "Baz"]), vec![12, 18]);
    assert_eq!(lib.instance_byte_count(explicit), Ok(24));

    let derived = lib.explicit(
        "ExplicitDerived",
        explicit,
        ClassLayout::explicit(),
        &[("Lol", int, 0), ("Omg", int, 20)],
    );
    assert_eq!(offsets(&lib, derived, &["Lol", "Omg"]), vec![24, 44]);
    assert_eq!(lib.instance_byte_count(derived), Ok(48));
}

#[test]
fn explicit_empty_types() {
    let lib = CoreLib::new();
    let empty_struct = lib.explicit(
        "EmptyStruct",
        lib.known(WellKnownType::ValueType),
        ClassLayout::explicit(),
        &[],
    );
    let empty_class = lib.explicit("EmptyClass", lib.object(), ClassLayout::explicit(), &[]);

    assert_eq!(lib.instance_field_size(empty_struct), Ok(1));
    assert_eq!(lib.instance_byte_count(empty_class), Ok(8));
}

#[test]
fn explicit_struct_honours_declared_size() {
    let lib = CoreLib::new();
    let sized = lib.explicit(
        "SizedStruct",
        lib.known(WellKnownType::ValueType),
        ClassLayout::explicit().with_size(48),
        &[("A", lib.int32(), 0)],
    );

    assert_eq!(lib.instance_field_size(sized), Ok(48));
}

#[test]
fn explicit_fields_may_overlap() {
    let lib = CoreLib::new();
    let union = lib.explicit(
        "Union",
        lib.known(WellKnownType::ValueType),
        ClassLayout::explicit(),
        &[
            ("AsLong", lib.known(WellKnownType::Int64), 0),
            ("AsInt", lib.int32(), 0),
        ],
    );

    assert_eq!(offsets(&lib, union, &["AsLong", "AsInt"]), vec![0, 0]);
    assert_eq!(lib.instance_field_size(union), Ok(8));
}

// ── Generic types ───────────────────────────────────────────────

#[test]
fn canonical_list_layout() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let list_canon = lib.get_instantiated_type(list, &[lib.canon_type()]);

    assert_eq!(offsets(&lib, list_canon, &["_items", "_size"]), vec![8, 16]);
    assert_eq!(lib.instance_byte_count(list_canon), Ok(24));
    assert_eq!(lib.instance_field_size(list_canon), Ok(8));
}

#[test]
fn nullable_layout_depends_on_argument() {
    let lib = CoreLib::new();
    let nullable = lib.known(WellKnownType::Nullable);
    let nullable_int = lib.get_instantiated_type(nullable, &[lib.int32()]);
    let nullable_long =
        lib.get_instantiated_type(nullable, &[lib.known(WellKnownType::Int64)]);

    assert_eq!(offsets(&lib, nullable_int, &["hasValue", "value"]), vec![0, 4]);
    assert_eq!(lib.instance_field_size(nullable_int), Ok(8));
    assert_eq!(lib.offset(nullable_long, "value"), 8);
    assert_eq!(lib.instance_field_size(nullable_long), Ok(16));
}

#[test]
fn open_field_type_cannot_be_laid_out() {
    let lib = CoreLib::new();
    let nullable = lib.known(WellKnownType::Nullable);

    let error = lib.instance_layout(nullable).unwrap_err();
    assert!(matches!(error, LayoutError::Unsupported { .. }), "{error:?}");
    assert_eq!(error.type_name(), "System.Nullable`1");
    assert_eq!(error.reason(), None);
}

#[test]
fn signature_variable_has_no_layout() {
    let lib = CoreLib::new();
    let error = lib.instance_layout(lib.t(0)).unwrap_err();
    assert!(matches!(error, LayoutError::Unsupported { .. }), "{error:?}");
}

// ── Type load failures ──────────────────────────────────────────

#[test]
fn explicit_layout_on_generic_type_fails() {
    let lib = CoreLib::new();
    let generic = lib.define(
        lib.builder("ExplicitGeneric`1")
            .with_base(lib.object())
            .with_generic_arity(1)
            .with_layout(ClassLayout::explicit()),
        TypeMembersBuilder::new().field(FieldSpec::new("Value", lib.int32()).at_offset(0)),
    );
    let instantiated = lib.get_instantiated_type(generic, &[lib.string()]);

    assert_eq!(
        load_reason(lib.instance_layout(instantiated)),
        TypeLoadReason::ExplicitLayoutOnGenericType
    );
}

#[test]
fn global_type_cannot_have_instance_fields() {
    let lib = CoreLib::new();
    let global = lib.module_global_type(lib.module);
    lib.complete_type(
        global,
        TypeMembersBuilder::new().field(FieldSpec::new("x", lib.int32())),
    )
    .unwrap();

    assert_eq!(
        load_reason(lib.instance_layout(global)),
        TypeLoadReason::InstanceFieldOnGlobalType {
            field: "x".to_owned()
        }
    );

    let other = lib.create_module("Other");
    assert_eq!(
        lib.instance_layout(lib.module_global_type(other)),
        Ok(InstanceLayout::default())
    );
}

#[test]
fn layout_kind_must_match_base() {
    let lib = CoreLib::new();
    let sequential = lib.laid_out(
        "SequentialBase",
        lib.object(),
        ClassLayout::sequential(),
        &[("A", lib.int32())],
    );
    let explicit = lib.explicit(
        "ExplicitDerived",
        sequential,
        ClassLayout::explicit(),
        &[("B", lib.int32(), 0)],
    );
    let auto = lib.class("AutoDerived", sequential, &[("C", lib.int32())]);

    assert_eq!(
        load_reason(lib.instance_layout(explicit)),
        TypeLoadReason::LayoutKindMismatch {
            base: "Test.SequentialBase".to_owned()
        }
    );
    assert_eq!(lib.offset(auto, "C"), 12);
}

#[test]
fn enum_needs_exactly_one_instance_field() {
    let lib = CoreLib::new();
    let enum_base = lib.known(WellKnownType::Enum);
    let none = lib.class("NoStorage", enum_base, &[]);
    let two = lib.class("TwoStorage", enum_base, &[("a", lib.int32()), ("b", lib.int32())]);

    assert_eq!(
        load_reason(lib.instance_layout(none)),
        TypeLoadReason::EnumFieldCount { found: 0 }
    );
    assert_eq!(
        load_reason(lib.instance_layout(two)),
        TypeLoadReason::EnumFieldCount { found: 2 }
    );
}

#[test]
fn enum_cannot_declare_layout() {
    let lib = CoreLib::new();
    let sequential = lib.laid_out(
        "SequentialEnum",
        lib.known(WellKnownType::Enum),
        ClassLayout::sequential(),
        &[("value__", lib.int32())],
    );

    assert_eq!(
        load_reason(lib.instance_layout(sequential)),
        TypeLoadReason::LayoutOnEnum
    );
}

#[test]
fn primitive_with_two_fields_fails() {
    let ctx = TypeSystemContext::new(TargetDetails::new(TargetArchitecture::X64));
    let core = ctx.create_module("Core");
    let object = ctx
        .define_type(
            TypeDefinitionBuilder::new(core, "System", "Object")
                .with_well_known(WellKnownType::Object),
        )
        .unwrap();
    let value_type = ctx
        .define_type(
            TypeDefinitionBuilder::new(core, "System", "ValueType")
                .with_base(object)
                .with_well_known(WellKnownType::ValueType),
        )
        .unwrap();
    let int = ctx
        .define_type(
            TypeDefinitionBuilder::new(core, "System", "Int32")
                .with_base(value_type)
                .with_well_known(WellKnownType::Int32),
        )
        .unwrap();
    ctx.complete_type(
        int,
        TypeMembersBuilder::new()
            .field(FieldSpec::new("a", int))
            .field(FieldSpec::new("b", int)),
    )
    .unwrap();

    let error = ctx.instance_layout(int).unwrap_err();
    assert_eq!(
        error.reason(),
        Some(&TypeLoadReason::PrimitiveFieldCount { found: 2 })
    );
}

#[test]
fn packing_must_be_a_small_power_of_two() {
    let lib = CoreLib::new();
    let value_type = lib.known(WellKnownType::ValueType);
    for packing in [3, 256] {
        let ty = lib.laid_out(
            &format!("Packing{packing}"),
            value_type,
            ClassLayout::sequential().with_packing(packing),
            &[("A", lib.int32())],
        );
        assert_eq!(
            load_reason(lib.instance_layout(ty)),
            TypeLoadReason::InvalidPackingSize { packing }
        );
    }

    let largest = lib.laid_out(
        "Packing128",
        value_type,
        ClassLayout::sequential().with_packing(128),
        &[("A", lib.int32())],
    );
    assert_eq!(lib.instance_field_size(largest), Ok(4));
}

#[test]
fn by_ref_instance_field_fails() {
    let lib = CoreLib::new();
    let span = lib.struct_("Span", &[("_reference", lib.get_by_ref_type(lib.int32()))]);

    assert_eq!(
        load_reason(lib.instance_layout(span)),
        TypeLoadReason::ByRefInstanceField {
            field: "_reference".to_owned()
        }
    );
}

#[test]
fn explicit_field_needs_an_offset() {
    let lib = CoreLib::new();
    let ty = lib.define(
        lib.builder("NoOffset")
            .with_base(lib.known(WellKnownType::ValueType))
            .with_layout(ClassLayout::explicit()),
        TypeMembersBuilder::new().field(FieldSpec::new("A", lib.int32())),
    );

    assert_eq!(
        load_reason(lib.instance_layout(ty)),
        TypeLoadReason::MissingExplicitOffset {
            field: "A".to_owned()
        }
    );
}

#[test]
fn misaligned_reference_field_fails() {
    let lib = CoreLib::new();
    let bad = lib.explicit(
        "Bad",
        lib.object(),
        ClassLayout::explicit(),
        &[("Ref", lib.string(), 4)],
    );

    let error = lib.instance_layout(bad).unwrap_err();
    assert_eq!(
        error.reason(),
        Some(&TypeLoadReason::MisalignedReferenceField {
            field: "Ref".to_owned(),
            offset: 4,
            pointer_size: 8,
        })
    );
    assert_eq!(
        error.to_string(),
        "failed to load type `Test.Bad`: explicit layout offset 4 not pointer-aligned \
         for field `Ref` (pointer size 8)"
    );
}

#[test]
fn huge_explicit_offset_overflows() {
    let lib = CoreLib::new();
    let ty = lib.explicit(
        "Huge",
        lib.known(WellKnownType::ValueType),
        ClassLayout::explicit(),
        &[("A", lib.int32(), u32::MAX - 1)],
    );

    assert_eq!(
        load_reason(lib.instance_layout(ty)),
        TypeLoadReason::LayoutOverflow
    );
}

#[test]
fn failures_are_cached() {
    let lib = CoreLib::new();
    let span = lib.struct_("Span", &[("_reference", lib.get_by_ref_type(lib.int32()))]);

    let first = lib.instance_layout(span);
    let second = lib.instance_layout(span);
    assert!(first.is_err());
    assert_eq!(first, second);
    assert_eq!(lib.field_offset(lib.field(span, "_reference")), first.map(|_| 0));
}

// ── Caching and publication ─────────────────────────────────────

#[test]
fn compute_is_pure_and_query_publishes_offsets() {
    let lib = CoreLib::new();
    let point = lib.struct_("Point", &[("X", lib.int32()), ("Y", lib.int32())]);
    let x = lib.field(point, "X");
    let y = lib.field(point, "Y");

    let computed = lib.compute_instance_field_layout(point).unwrap();
    assert_eq!(
        computed.offsets,
        vec![
            FieldAndOffset { field: x, offset: 0 },
            FieldAndOffset { field: y, offset: 4 },
        ]
    );
    assert_eq!(lib.field_node(x).offset.get(), None);

    assert_eq!(lib.instance_layout(point), Ok(computed.layout));
    assert_eq!(lib.field_node(y).offset.get(), Some(&4));
}

#[test]
fn field_offset_triggers_layout() {
    let lib = CoreLib::new();
    let point = lib.struct_("Point", &[("X", lib.int32()), ("Y", lib.int32())]);

    assert_eq!(lib.field_offset(lib.field(point, "Y")), Ok(4));
    assert_eq!(
        lib.instance_layout(point),
        Ok(InstanceLayout {
            field_size: 8,
            field_alignment: 4,
            byte_count_unaligned: 8,
            byte_count_alignment: 8,
        })
    );
}

#[test]
fn concurrent_layout_queries_agree() {
    let lib = CoreLib::new();
    let list = lib.define_list();
    let list_string = lib.get_instantiated_type(list, &[lib.string()]);

    let results: Vec<(Result<u32, LayoutError>, u32)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    (
                        lib.instance_byte_count(list_string),
                        lib.offset(list_string, "_size"),
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result, (Ok(24), 16));
    }
}

// ── Other targets ───────────────────────────────────────────────

#[test]
fn wasm32_uses_four_byte_pointers() {
    let lib = CoreLib::with_target(TargetArchitecture::Wasm32, FieldLayoutPolicy::runtime());
    let class = lib.class(
        "Small",
        lib.object(),
        &[("S", lib.string()), ("I", lib.int32())],
    );

    assert_eq!(offsets(&lib, class, &["S", "I"]), vec![4, 8]);
    assert_eq!(lib.instance_byte_count(class), Ok(12));
    assert_eq!(lib.instance_field_size(class), Ok(4));
}

#[test]
fn arm32_object_alignment_follows_fields() {
    let lib = CoreLib::with_target(TargetArchitecture::Arm, FieldLayoutPolicy::runtime());
    let wide = lib.struct_("Wide", &[("D", lib.known(WellKnownType::Double))]);
    let narrow = lib.struct_("Narrow", &[("I", lib.int32())]);

    assert_eq!(lib.instance_byte_alignment(wide), Ok(8));
    assert_eq!(lib.instance_byte_alignment(narrow), Ok(4));
}

// ── GC pointers ─────────────────────────────────────────────────

#[test]
fn gc_pointer_containment() {
    let lib = CoreLib::new();
    let int = lib.int32();
    let string = lib.string();
    let plain = lib.struct_("Plain", &[("I", int)]);
    let holder = lib.struct_("Holder", &[("S", string)]);
    let nested = lib.struct_("Nested", &[("Inner", holder)]);
    let class = lib.class("WithRef", lib.object(), &[("S", string)]);
    let derived = lib.class("Derived", class, &[]);
    let nullable = lib.known(WellKnownType::Nullable);

    assert!(!lib.contains_gc_pointers(int));
    assert!(!lib.contains_gc_pointers(lib.object()));
    assert!(!lib.contains_gc_pointers(string));
    assert!(!lib.contains_gc_pointers(plain));
    assert!(lib.contains_gc_pointers(holder));
    assert!(lib.contains_gc_pointers(nested));
    assert!(lib.contains_gc_pointers(class));
    assert!(lib.contains_gc_pointers(derived));
    assert!(!lib.contains_gc_pointers(lib.get_instantiated_type(nullable, &[int])));
    assert!(lib.contains_gc_pointers(lib.get_instantiated_type(nullable, &[string])));
    assert!(lib.contains_gc_pointers(nullable));
}

#[test]
fn gc_pointers_of_arrays_are_those_of_elements() {
    let lib = CoreLib::new();
    let plain = lib.struct_("Plain", &[("I", lib.int32())]);
    let holder = lib.struct_("Holder", &[("S", lib.string())]);

    assert!(!lib.contains_gc_pointers(lib.get_array_type(lib.int32())));
    assert!(!lib.contains_gc_pointers(lib.get_array_type(plain)));
    assert!(lib.contains_gc_pointers(lib.get_array_type(lib.string())));
    assert!(lib.contains_gc_pointers(lib.get_md_array_type(holder, 2)));
    assert!(!lib.contains_gc_pointers(lib.get_pointer_type(lib.string())));
}

// ── Homogeneous float aggregates ────────────────────────────────

#[test]
fn float_structs_are_hfas() {
    let lib = CoreLib::with_target(TargetArchitecture::Arm64, FieldLayoutPolicy::runtime());
    let float = lib.known(WellKnownType::Single);
    let double = lib.known(WellKnownType::Double);
    let vector2 = lib.struct_("Vector2", &[("X", float), ("Y", float)]);
    let vector3 = lib.struct_("Vector3", &[("XY", vector2), ("Z", float)]);
    let pair = lib.struct_("DoublePair", &[("A", double), ("B", double)]);

    assert_eq!(lib.is_hfa(float), Ok(true));
    assert_eq!(lib.is_hfa(vector2), Ok(true));
    assert_eq!(lib.is_hfa(vector3), Ok(true));
    assert_eq!(lib.is_hfa(pair), Ok(true));
    assert_eq!(lib.hfa_element_type(vector3), Ok(Some(float)));
    assert_eq!(lib.hfa_element_type(pair), Ok(Some(double)));
}

#[test]
fn non_hfa_structs() {
    let lib = CoreLib::with_target(TargetArchitecture::Arm64, FieldLayoutPolicy::runtime());
    let float = lib.known(WellKnownType::Single);
    let double = lib.known(WellKnownType::Double);
    let mixed = lib.struct_("Mixed", &[("A", float), ("B", double)]);
    let with_int = lib.struct_("WithInt", &[("A", float), ("B", lib.int32())]);
    let empty = lib.struct_("Empty", &[]);
    let too_many = lib.struct_(
        "FiveFloats",
        &[("A", float), ("B", float), ("C", float), ("D", float), ("E", float)],
    );
    let explicit = lib.explicit(
        "ExplicitFloats",
        lib.known(WellKnownType::ValueType),
        ClassLayout::explicit(),
        &[("A", float, 0), ("B", float, 4)],
    );
    let class = lib.class("FloatClass", lib.object(), &[("A", float)]);

    for ty in [mixed, with_int, empty, too_many, explicit, class, lib.int32()] {
        assert_eq!(lib.is_hfa(ty), Ok(false), "{}", lib.type_name(ty));
        assert_eq!(lib.hfa_element_type(ty), Ok(None), "{}", lib.type_name(ty));
    }
}

// ── Statics ─────────────────────────────────────────────────────

fn holder_with_statics(lib: &CoreLib) -> TypeId {
    let int = lib.int32();
    let boolean = lib.known(WellKnownType::Boolean);
    let with_ref = lib.struct_("WithRef", &[("b", boolean), ("s", lib.string())]);
    lib.statics(
        "Statics",
        &[
            ("Count", int, FieldAttributes::empty()),
            ("Name", lib.string(), FieldAttributes::empty()),
            ("PerThread", int, FieldAttributes::THREAD_STATIC),
            ("Constant", int, FieldAttributes::LITERAL),
            ("Blob", int, FieldAttributes::HAS_RVA),
            ("Entry", with_ref, FieldAttributes::empty()),
        ],
    )
}

#[test]
fn statics_split_into_blocks_after_header() {
    let lib = CoreLib::new();
    let holder = holder_with_statics(&lib);

    assert_eq!(
        lib.static_layout(holder),
        Ok(StaticLayout {
            gc_statics: StaticsBlock {
                size: 32,
                largest_alignment: 8
            },
            thread_statics: StaticsBlock {
                size: 12,
                largest_alignment: 4
            },
            non_gc_statics: StaticsBlock {
                size: 4,
                largest_alignment: 4
            },
        })
    );
    assert_eq!(offsets(&lib, holder, &["Count", "Name", "PerThread", "Entry"]), vec![0, 8, 8, 16]);
    assert_eq!(
        lib.static_field_block(lib.field(holder, "Name")),
        StaticBlockKind::GcStatics
    );
    assert_eq!(
        lib.static_field_block(lib.field(holder, "Entry")),
        StaticBlockKind::GcStatics
    );
    assert_eq!(
        lib.static_field_block(lib.field(holder, "PerThread")),
        StaticBlockKind::ThreadStatics
    );
    assert_eq!(
        lib.static_field_block(lib.field(holder, "Count")),
        StaticBlockKind::NonGcStatics
    );
}

#[test]
fn metadata_policy_has_no_header() {
    let lib = CoreLib::with_target(TargetArchitecture::X64, FieldLayoutPolicy::metadata());
    let holder = holder_with_statics(&lib);

    assert_eq!(offsets(&lib, holder, &["Count", "Name", "PerThread", "Entry"]), vec![0, 0, 0, 8]);
    let layout = lib.static_layout(holder).unwrap();
    assert_eq!(layout.block(StaticBlockKind::GcStatics).size, 24);
    assert_eq!(layout.block(StaticBlockKind::ThreadStatics).size, 4);
}

#[test]
fn storage_free_statics_have_no_offset() {
    let lib = CoreLib::new();
    let holder = holder_with_statics(&lib);

    let error = lib.field_offset(lib.field(holder, "Constant")).unwrap_err();
    assert_eq!(
        error,
        LayoutError::Unsupported {
            type_name: "Test.Statics".to_owned(),
            what: "field `Constant` occupies no storage".to_owned(),
        }
    );
    assert!(lib.field_offset(lib.field(holder, "Blob")).is_err());
}

#[test]
fn unused_header_is_dropped() {
    let lib = CoreLib::new();
    let holder = lib.statics("OnlyInt", &[("Count", lib.int32(), FieldAttributes::empty())]);

    let layout = lib.static_layout(holder).unwrap();
    assert_eq!(layout.gc_statics, StaticsBlock::default());
    assert_eq!(layout.thread_statics, StaticsBlock::default());
    assert_eq!(layout.non_gc_statics.size, 4);
}

#[test]
fn type_without_statics_has_empty_layout() {
    let lib = CoreLib::new();
    let point = lib.struct_("Point", &[("X", lib.int32())]);

    assert_eq!(lib.static_layout(point), Ok(StaticLayout::default()));
    assert_eq!(
        lib.compute_static_field_layout(point),
        Ok(ComputedStaticFieldLayout::default())
    );
}

#[test]
fn statics_of_instantiated_types_are_substituted() {
    let lib = CoreLib::new();
    let cache = lib.define(
        lib.builder("Cache`1")
            .with_base(lib.object())
            .with_generic_arity(1),
        TypeMembersBuilder::new().field(
            FieldSpec::new("s_value", lib.t(0)).with_attributes(FieldAttributes::STATIC),
        ),
    );
    let cache_string = lib.get_instantiated_type(cache, &[lib.string()]);
    let cache_int = lib.get_instantiated_type(cache, &[lib.int32()]);

    let string_value = lib.field(cache_string, "s_value");
    let int_value = lib.field(cache_int, "s_value");
    assert_eq!(lib.static_field_block(string_value), StaticBlockKind::GcStatics);
    assert_eq!(lib.field_offset(string_value), Ok(8));
    assert_eq!(lib.static_field_block(int_value), StaticBlockKind::NonGcStatics);
    assert_eq!(lib.field_offset(int_value), Ok(0));
}

#[test]
fn by_ref_static_fails() {
    let lib = CoreLib::new();
    let holder = lib.statics(
        "RefStatics",
        &[("Ref", lib.get_by_ref_type(lib.int32()), FieldAttributes::empty())],
    );

    let error = lib.static_layout(holder).unwrap_err();
    assert_eq!(
        error.reason(),
        Some(&TypeLoadReason::ByRefStaticField {
            field: "Ref".to_owned()
        })
    );
}

#[test]
fn derived_statics_start_their_own_blocks() {
    let lib = CoreLib::new();
    let int = lib.int32();
    let string = lib.string();
    let base = lib.statics(
        "StaticBase",
        &[
            ("A", int, FieldAttributes::empty()),
            ("B", string, FieldAttributes::empty()),
        ],
    );
    let derived = lib.define(
        lib.builder("StaticDerived").with_base(base),
        TypeMembersBuilder::new()
            .field(FieldSpec::new("C", int).with_attributes(FieldAttributes::STATIC))
            .field(FieldSpec::new("D", string).with_attributes(FieldAttributes::STATIC)),
    );

    assert_eq!(offsets(&lib, base, &["A", "B"]), vec![0, 8]);
    assert_eq!(offsets(&lib, derived, &["C", "D"]), vec![0, 8]);
    assert_eq!(lib.static_layout(derived), lib.static_layout(base));
    assert_eq!(lib.find_field(derived, "A"), None);
}

fn everything_non_gc(_ctx: &TypeSystemContext, _field: FieldId) -> StaticBlockKind {
    StaticBlockKind::NonGcStatics
}

#[test]
fn custom_policy_classifies_statics() {
    let policy = FieldLayoutPolicy {
        classify_static_block: everything_non_gc,
        ..FieldLayoutPolicy::default()
    };
    let lib = CoreLib::with_target(TargetArchitecture::X64, policy);
    let holder = lib.statics(
        "Mixed",
        &[
            ("Count", lib.int32(), FieldAttributes::empty()),
            ("Name", lib.string(), FieldAttributes::empty()),
        ],
    );

    let layout = lib.static_layout(holder).unwrap();
    assert_eq!(offsets(&lib, holder, &["Count", "Name"]), vec![0, 8]);
    assert_eq!(
        layout.non_gc_statics,
        StaticsBlock {
            size: 16,
            largest_alignment: 8
        }
    );
    assert_eq!(layout.gc_statics.size, 0);
    assert_eq!(default_static_block(&lib, lib.field(holder, "Name")), StaticBlockKind::GcStatics);
}

#[test]
fn instance_and_static_layouts_are_independent() {
    let lib = CoreLib::new();
    let mixed = lib.define(
        lib.builder("MixedMembers").with_base(lib.object()),
        TypeMembersBuilder::new()
            .field(FieldSpec::new("s_count", lib.int32()).with_attributes(FieldAttributes::STATIC))
            .field(FieldSpec::new("_value", lib.int32())),
    );

    assert_eq!(lib.offset(mixed, "_value"), 8);
    assert_eq!(lib.offset(mixed, "s_count"), 0);
    assert_eq!(lib.instance_byte_count(mixed), Ok(16));
}

// ── Incomplete definitions ──────────────────────────────────────

#[test]
fn layout_waits_for_definition_members() {
    let lib = CoreLib::new();
    let boxed = lib
        .define_type(
            lib.builder("Box`1")
                .with_base(lib.object())
                .with_generic_arity(1),
        )
        .unwrap();
    let box_long = lib.get_instantiated_type(boxed, &[lib.known(WellKnownType::Int64)]);

    let error = lib.instance_layout(box_long).unwrap_err();
    assert_eq!(
        error,
        LayoutError::Unsupported {
            type_name: "Test.Box`1<System.Int64>".to_owned(),
            what: "members of `Test.Box`1` are not defined yet".to_owned(),
        }
    );
    assert!(lib.static_layout(box_long).is_err());
    assert!(!lib.contains_gc_pointers(box_long));

    lib.complete_type(
        boxed,
        TypeMembersBuilder::new()
            .field(FieldSpec::new("_value", lib.t(0)))
            .field(FieldSpec::new("_label", lib.string())),
    )
    .unwrap();

    assert_eq!(lib.offset(box_long, "_value"), 8);
    assert_eq!(lib.offset(box_long, "_label"), 16);
    assert_eq!(lib.instance_byte_count(box_long), Ok(24));
    assert!(lib.contains_gc_pointers(box_long));
    assert_eq!(lib.static_layout(box_long), Ok(StaticLayout::default()));
}
