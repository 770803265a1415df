//! Native dispatch integration tests.
//!
//! Exercises the marshalling contract through the VM's send entry point:
//! arity, strict casts, the small-integer guard, and result boxing.

use memory_manager::HeapConfig;
use native_dispatch::{MarshalError, NativeMethod, ParamSpec};
use object_model::{CastError, ObjRef};
use runtime::{Vm, VmError};

fn vm() -> Vm {
    Vm::new(HeapConfig::with_capacity(16 * 1024)).unwrap()
}

/// Installs `between:and:` on Array: two integer parameters, returns their
/// sum as a tagged integer.
fn install_sum(vm: &mut Vm) {
    let selector = vm.symbols.intern("between:and:");
    let method = NativeMethod::new(
        selector,
        vm.core.array,
        vec![ParamSpec::Engine, ParamSpec::SmallInt, ParamSpec::SmallInt],
        Box::new(|_ctx, _receiver, args| {
            let a = args[0].as_small_int().unwrap();
            let b = args[1].as_small_int().unwrap();
            Ok(Some(ObjRef::small_int(a + b)))
        }),
    )
    .unwrap();
    vm.register_native(method);
}

#[test]
fn test_arity_mismatch_fails_without_invoking() {
    let mut vm = vm();
    install_sum(&mut vm);
    let selector = vm.symbols.intern("between:and:");
    let receiver = vm.new_array(&[]).unwrap();

    for args in [
        vec![receiver],
        vec![receiver, ObjRef::small_int(1)],
        vec![
            receiver,
            ObjRef::small_int(1),
            ObjRef::small_int(2),
            ObjRef::small_int(3),
        ],
    ] {
        let err = vm.send(&selector, &args).unwrap_err();
        match err {
            VmError::Marshal(MarshalError::WrongArgumentCount { expected, found }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, args.len());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn test_matching_arity_invokes() {
    let mut vm = vm();
    install_sum(&mut vm);
    let selector = vm.symbols.intern("between:and:");
    let receiver = vm.new_array(&[]).unwrap();

    let result = vm
        .send(
            &selector,
            &[receiver, ObjRef::small_int(30), ObjRef::small_int(12)],
        )
        .unwrap();
    assert_eq!(result, ObjRef::small_int(42));
}

#[test]
fn test_receiver_type_cast_fidelity() {
    let mut vm = vm();
    install_sum(&mut vm);
    let selector = vm.symbols.intern("between:and:");

    // A receiver whose class is not Array fails, naming the expected type.
    let wrong = vm.new_object(vm.core.context, 4).unwrap();
    let err = vm
        .send(
            &selector,
            &[wrong, ObjRef::small_int(1), ObjRef::small_int(2)],
        )
        .unwrap_err();
    match err {
        VmError::Marshal(MarshalError::TypeMismatch(CastError::TypeMismatch {
            expected,
            found,
        })) => {
            assert_eq!(expected, "Array");
            assert_eq!(found, "Context");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_small_integer_guard_never_coerces() {
    let mut vm = vm();
    install_sum(&mut vm);
    let selector = vm.symbols.intern("between:and:");
    let receiver = vm.new_array(&[]).unwrap();
    let heap_arg = vm.new_object(vm.core.object, 0).unwrap();

    let err = vm
        .send(&selector, &[receiver, ObjRef::small_int(1), heap_arg])
        .unwrap_err();
    assert_eq!(
        err,
        VmError::Marshal(MarshalError::SmallIntegerExpected { slot: 2 })
    );
}

#[test]
fn test_void_routine_returns_nil() {
    let mut vm = vm();
    let selector = vm.symbols.intern("touch");
    let method = NativeMethod::new(
        selector.clone(),
        vm.core.object,
        vec![],
        Box::new(|_ctx, _receiver, _args| Ok(None)),
    )
    .unwrap();
    vm.register_native(method);

    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let result = vm.send(&selector, &[receiver]).unwrap();
    assert_eq!(result, vm.nil());
}

#[test]
fn test_routine_allocation_may_collect_safely() {
    // A native routine that allocates under a tiny heap: the nil root and
    // the VM singletons must stay valid across the cycles it triggers.
    let mut vm = Vm::new(HeapConfig::with_capacity(
        std::mem::size_of::<usize>() * 128,
    ))
    .unwrap();
    let selector = vm.symbols.intern("churn");
    let array_class = vm.core.array;
    let method = NativeMethod::new(
        selector.clone(),
        vm.core.object,
        vec![],
        Box::new(move |ctx, _receiver, _args| {
            for _ in 0..32 {
                ctx.heap.allocate(array_class, 4)?;
            }
            Ok(None)
        }),
    )
    .unwrap();
    vm.register_native(method);

    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let root = vm.heap.add_root(receiver);
    let receiver = vm.heap.root(root);
    let result = vm.send(&selector, &[receiver]).unwrap();

    assert!(vm.heap.stats().collections > 0);
    assert_eq!(result, vm.nil());
    assert_eq!(vm.heap.class_of(vm.nil()), Some(vm.core.undefined_object));
}

#[test]
fn test_receiver_returned_after_routine_collection_is_current() {
    // A routine that churns past the semispace capacity and then returns
    // its receiver: the reference handed back must be the receiver's
    // post-cycle address, never one into the vacated space.
    let mut vm = Vm::new(HeapConfig::with_capacity(
        std::mem::size_of::<usize>() * 128,
    ))
    .unwrap();
    let selector = vm.symbols.intern("churnThenSelf");
    let array_class = vm.core.array;
    let method = NativeMethod::new(
        selector.clone(),
        vm.core.object,
        vec![],
        Box::new(move |ctx, receiver, _args| {
            for _ in 0..64 {
                ctx.heap.allocate(array_class, 4)?;
            }
            Ok(Some(receiver.get()))
        }),
    )
    .unwrap();
    vm.register_native(method);

    let receiver = vm.new_object(vm.core.object, 0).unwrap();
    let root = vm.heap.add_root(receiver);
    let result = vm.send(&selector, &[vm.heap.root(root)]).unwrap();

    assert!(vm.heap.stats().collections > 0);
    assert!(vm.heap.is_in_active_space(result));
    assert!(!vm.heap.is_in_inactive_space(result));
    assert_eq!(result, vm.heap.root(root));
    assert_eq!(vm.heap.class_of(result), Some(vm.core.object));
    assert_eq!(vm.heap.frame_depth(), 0);
}

#[test]
fn test_marshalling_errors_are_recoverable() {
    // After a failed dispatch the VM keeps working.
    let mut vm = vm();
    install_sum(&mut vm);
    let selector = vm.symbols.intern("between:and:");
    let receiver = vm.new_array(&[]).unwrap();

    assert!(vm.send(&selector, &[receiver]).is_err());
    let result = vm
        .send(
            &selector,
            &[receiver, ObjRef::small_int(2), ObjRef::small_int(2)],
        )
        .unwrap();
    assert_eq!(result, ObjRef::small_int(4));
}
