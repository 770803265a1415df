//! Compiled-method execution tests across the whole core.
//!
//! Methods are assembled as bytecode, installed on the VM, translated
//! lazily, and executed with the collector and native dispatch live.

use bytecode_system::{encode, Opcode};
use memory_manager::HeapConfig;
use method_compiler::{CompileError, ExecError, MethodTranslator};
use native_dispatch::{NativeMethod, ParamSpec};
use object_model::ObjRef;
use runtime::{Vm, VmError};
use std::cell::RefCell;
use std::rc::Rc;

fn vm() -> Vm {
    Vm::new(HeapConfig::with_capacity(32 * 1024)).unwrap()
}

fn assemble(items: &[(Opcode, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (opcode, operand) in items {
        encode(*opcode, *operand, &mut out);
    }
    out
}

/// The canonical two-element send: `[push-argument 0, push-literal 0,
/// mark-arguments 2, send, return]` must build the argument array `[X, Y]`
/// from Arguments[0] and Literal[0] before issuing the send.
#[test]
fn test_mark_arguments_builds_receiver_and_literal_pair() {
    let mut vm = vm();
    let mut translator = MethodTranslator::new();

    let seen: Rc<RefCell<Vec<ObjRef>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let selector = vm.symbols.intern("pair:");
    let native = NativeMethod::new(
        selector,
        vm.core.object,
        vec![ParamSpec::Instance(vm.core.object)],
        Box::new(move |_ctx, receiver, args| {
            sink.borrow_mut().push(receiver.get());
            sink.borrow_mut().push(args[0].as_instance().unwrap());
            Ok(Some(ObjRef::small_int(1)))
        }),
    )
    .unwrap();
    vm.register_native(native);

    let x = vm.new_object(vm.core.object, 0).unwrap();
    let y = vm.new_object(vm.core.object, 0).unwrap();
    let bytecode = assemble(&[
        (Opcode::PushArgument, 0),
        (Opcode::PushLiteral, 0),
        (Opcode::MarkArguments, 2),
        (Opcode::SendMessage, 0),
        (Opcode::DoSpecial, 2),
    ]);
    let method = vm
        .install_method(vm.core.object, "callPair", bytecode, &[y], &["pair:"], 0, 1)
        .unwrap();

    let context = vm.new_context(method, &[x]).unwrap();
    let result = translator.invoke(&mut vm, context).unwrap();

    assert_eq!(result, ObjRef::small_int(1));
    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], x, "argument array slot 0 must be Arguments[0]");
    assert_eq!(seen[1], y, "argument array slot 1 must be Literal[0]");
    assert_eq!(vm.heap.frame_depth(), 0);
}

/// Constants 0 through 9 execute to the exact tagged integer.
#[test]
fn test_push_constant_range_executes_exactly() {
    let mut vm = vm();
    let mut translator = MethodTranslator::new();
    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let root = vm.heap.add_root(receiver);

    for value in 0..=9u8 {
        let bytecode = assemble(&[(Opcode::PushConstant, value), (Opcode::DoSpecial, 2)]);
        let method = vm
            .install_method(vm.core.object, "constant", bytecode, &[], &[], 0, 1)
            .unwrap();
        let receiver = vm.heap.root(root);
        let context = vm.new_context(method, &[receiver]).unwrap();
        let result = translator.invoke(&mut vm, context).unwrap();
        assert_eq!(result, ObjRef::small_int(value as isize));
    }
}

/// An out-of-range constant is a structured diagnostic, and the VM keeps
/// running afterwards.
#[test]
fn test_unrecognized_constant_is_rejected_not_fatal() {
    let mut vm = vm();
    let mut translator = MethodTranslator::new();
    let receiver = vm.new_object(vm.core.object, 0).unwrap();

    let bad = vm
        .install_method(
            vm.core.object,
            "badConstant",
            assemble(&[(Opcode::PushConstant, 13), (Opcode::DoSpecial, 2)]),
            &[],
            &[],
            0,
            1,
        )
        .unwrap();
    let context = vm.new_context(bad, &[receiver]).unwrap();
    let err = translator.invoke(&mut vm, context).unwrap_err();
    assert!(matches!(
        err,
        ExecError::Compile(CompileError::UnknownConstant {
            operand: 13,
            offset: 0,
        })
    ));

    // The same VM still compiles and runs a well-formed method.
    let good = vm
        .install_method(
            vm.core.object,
            "goodConstant",
            assemble(&[(Opcode::PushConstant, 5), (Opcode::DoSpecial, 2)]),
            &[],
            &[],
            0,
            1,
        )
        .unwrap();
    let context = vm.new_context(good, &[receiver]).unwrap();
    assert_eq!(
        translator.invoke(&mut vm, context).unwrap(),
        ObjRef::small_int(5)
    );
}

/// Nested bytecode sends: the caller's send falls back to method lookup,
/// activates the callee, and the chain unwinds completely.
#[test]
fn test_nested_bytecode_sends_unwind() {
    let mut vm = vm();
    let mut translator = MethodTranslator::new();

    // callee: ^3
    vm.install_method(
        vm.core.object,
        "three",
        assemble(&[(Opcode::PushConstant, 3), (Opcode::DoSpecial, 2)]),
        &[],
        &[],
        0,
        1,
    )
    .unwrap();
    // middle: ^self three
    vm.install_method(
        vm.core.object,
        "callThree",
        assemble(&[
            (Opcode::PushArgument, 0),
            (Opcode::MarkArguments, 1),
            (Opcode::SendMessage, 0),
            (Opcode::DoSpecial, 2),
        ]),
        &[],
        &["three"],
        0,
        1,
    )
    .unwrap();
    // outer: ^self callThree
    let outer = vm
        .install_method(
            vm.core.object,
            "callCallThree",
            assemble(&[
                (Opcode::PushArgument, 0),
                (Opcode::MarkArguments, 1),
                (Opcode::SendMessage, 0),
                (Opcode::DoSpecial, 2),
            ]),
            &[],
            &["callThree"],
            0,
            1,
        )
        .unwrap();

    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let context = vm.new_context(outer, &[receiver]).unwrap();
    let result = translator.invoke(&mut vm, context).unwrap();
    assert_eq!(result, ObjRef::small_int(3));
    assert_eq!(vm.heap.frame_depth(), 0);
}

/// A send that fails deep in the activation tree unwinds every frame.
#[test]
fn test_error_deep_in_send_tree_unwinds_all_frames() {
    let mut vm = vm();
    let mut translator = MethodTranslator::new();

    let caller = vm
        .install_method(
            vm.core.object,
            "callMissing",
            assemble(&[
                (Opcode::PushArgument, 0),
                (Opcode::MarkArguments, 1),
                (Opcode::SendMessage, 0),
                (Opcode::DoSpecial, 2),
            ]),
            &[],
            &["missing"],
            0,
            1,
        )
        .unwrap();

    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let context = vm.new_context(caller, &[receiver]).unwrap();
    let err = translator.invoke(&mut vm, context).unwrap_err();
    assert!(matches!(
        err,
        ExecError::Vm(VmError::DoesNotUnderstand { .. })
    ));
    assert_eq!(vm.heap.frame_depth(), 0);
}

/// Compiled frames keep their registers correct across collection cycles
/// forced by allocations inside the frame.
#[test]
fn test_compiled_frame_survives_collection_pressure() {
    let mut vm = Vm::new(HeapConfig::with_capacity(
        std::mem::size_of::<usize>() * 256,
    ))
    .unwrap();
    let mut translator = MethodTranslator::new();

    // A native that churns the heap, then the method returns its literal.
    let selector = vm.symbols.intern("churn");
    let array_class = vm.core.array;
    let native = NativeMethod::new(
        selector,
        vm.core.object,
        vec![],
        Box::new(move |ctx, _receiver, _args| {
            for _ in 0..48 {
                ctx.heap.allocate(array_class, 4)?;
            }
            Ok(None)
        }),
    )
    .unwrap();
    vm.register_native(native);

    // marker := literal[0]; self churn; ^literal[0]
    let bytecode = assemble(&[
        (Opcode::PushArgument, 0),
        (Opcode::MarkArguments, 1),
        (Opcode::SendMessage, 0),
        (Opcode::DoSpecial, 5),
        (Opcode::PushLiteral, 0),
        (Opcode::DoSpecial, 2),
    ]);
    let marker = vm.new_object(vm.core.object, 1).unwrap();
    let marker_root = vm.heap.add_root(marker);
    let marker = vm.heap.root(marker_root);
    vm.set_field(marker, 0, ObjRef::small_int(77)).unwrap();

    let method = vm
        .install_method(
            vm.core.object,
            "churnAndReturn",
            bytecode,
            &[vm.heap.root(marker_root)],
            &["churn"],
            0,
            1,
        )
        .unwrap();
    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let context = vm.new_context(method, &[receiver]).unwrap();

    let result = translator.invoke(&mut vm, context).unwrap();
    assert!(vm.heap.stats().collections > 0);
    assert_eq!(result, vm.heap.root(marker_root));
    assert_eq!(vm.field(result, 0).unwrap(), ObjRef::small_int(77));
    assert_eq!(vm.heap.frame_depth(), 0);
}
