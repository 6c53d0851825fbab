//! Name formatting for diagnostics and debugging.

use ilc_hash::ArrayRank;

use crate::{FieldId, GenericParameterKind, MethodId, TypeData, TypeId, TypeSystemContext};

impl TypeSystemContext {
    /// Fully qualified name of a type.
    pub fn type_name(&self, ty: TypeId) -> String {
        let mut buf = String::new();
        self.format_type_into(ty, &mut buf);
        buf
    }

    /// Format a type into an existing string buffer.
    pub fn format_type_into(&self, ty: TypeId, buf: &mut String) {
        match self.type_data(ty) {
            TypeData::Definition(definition) => {
                if let Some(enclosing) = definition.enclosing {
                    self.format_type_into(enclosing, buf);
                    buf.push('+');
                } else if !definition.namespace.is_empty() {
                    buf.push_str(&definition.namespace);
                    buf.push('.');
                }
                buf.push_str(&definition.name);
            }
            TypeData::Instantiated {
                definition,
                instantiation,
            } => {
                self.format_type_into(*definition, buf);
                self.format_arguments_into(instantiation, buf);
            }
            TypeData::Array { element, rank } => {
                self.format_type_into(*element, buf);
                match rank {
                    ArrayRank::SingleDimensional => buf.push_str("[]"),
                    ArrayRank::MultiDimensional(1) => buf.push_str("[*]"),
                    ArrayRank::MultiDimensional(rank) => {
                        buf.push('[');
                        for _ in 1..*rank {
                            buf.push(',');
                        }
                        buf.push(']');
                    }
                }
            }
            TypeData::ByRef { parameter } => {
                self.format_type_into(*parameter, buf);
                buf.push('&');
            }
            TypeData::Pointer { parameter } => {
                self.format_type_into(*parameter, buf);
                buf.push('*');
            }
            TypeData::SignatureVariable { kind, index } => {
                buf.push_str(match kind {
                    GenericParameterKind::Type => "!",
                    GenericParameterKind::Method => "!!",
                });
                buf.push_str(&index.to_string());
            }
            TypeData::Canon => buf.push_str("__Canon"),
        }
    }

    fn format_arguments_into(&self, args: &[TypeId], buf: &mut String) {
        buf.push('<');
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                buf.push(',');
            }
            self.format_type_into(arg, buf);
        }
        buf.push('>');
    }

    /// `Owner.Name`, with method arguments for instantiated methods.
    pub fn format_method(&self, method: MethodId) -> String {
        let mut buf = self.type_name(self.owning_type(method));
        buf.push('.');
        buf.push_str(self.method_name(method));
        if self.method_definition(method) != method {
            self.format_arguments_into(self.method_instantiation(method), &mut buf);
        }
        buf
    }

    /// `Owner.Name`.
    pub fn format_field(&self, field: FieldId) -> String {
        let mut buf = self.type_name(self.field_owner(field));
        buf.push('.');
        buf.push_str(self.field_name(field));
        buf
    }
}
