//! Property tests for the inlining pass: it must terminate at a fixed point,
//! never leave dangling references, and never change the value a program
//! computes.

use std::collections::HashMap;

use proptest::prelude::*;
use texture_forge::codegen::compiler::InstructionCompiler;
use texture_forge::codegen::expr::Expr;
use texture_forge::codegen::instruction::{Instruction, ShaderType, VarDecl};

/// Straight-line integer programs: each instruction declares `v{i}` from a
/// constant or an addition/subtraction/multiplication over earlier names.
fn program_strategy() -> impl Strategy<Value = Vec<Instruction>> {
    (1usize..10).prop_flat_map(|len| {
        let mut instruction_strategies = Vec::with_capacity(len);
        for i in 0..len {
            let constant = (-100i64..100).prop_map(|v| Expr::Constant(v.to_string()));
            let strategy: BoxedStrategy<Expr> = if i == 0 {
                constant.boxed()
            } else {
                let operand = prop_oneof![
                    (0..i).prop_map(|j| Expr::Variable(format!("v{j}"))),
                    (-100i64..100).prop_map(|v| Expr::Constant(v.to_string())),
                ]
                .boxed();
                prop_oneof![
                    constant,
                    (
                        operand.clone(),
                        prop_oneof![Just("+"), Just("-"), Just("*")],
                        operand
                    )
                        .prop_map(|(l, op, r)| Expr::binary(l, op, r)),
                ]
                .boxed()
            };
            instruction_strategies.push(strategy.prop_map(move |expr| {
                Instruction::new(VarDecl::new(ShaderType::Int, format!("v{i}")), expr)
            }));
        }
        instruction_strategies
    })
}

fn eval(expr: &Expr, env: &HashMap<String, i64>) -> i64 {
    match expr {
        Expr::Constant(s) => s.parse().unwrap(),
        Expr::Variable(name) => env[name],
        Expr::Binary { left, op, right } => {
            let l = eval(left, env);
            let r = eval(right, env);
            match op.as_str() {
                "+" => l.wrapping_add(r),
                "-" => l.wrapping_sub(r),
                "*" => l.wrapping_mul(r),
                other => panic!("unexpected operator {other}"),
            }
        }
        other => panic!("unexpected expression {other:?}"),
    }
}

fn run(program: &[Instruction]) -> HashMap<String, i64> {
    let mut env = HashMap::new();
    for inst in program {
        let value = eval(&inst.expr, &env);
        env.insert(inst.result.name.clone(), value);
    }
    env
}

proptest! {
    #[test]
    fn inlining_reaches_a_fixed_point(program in program_strategy()) {
        let once = InstructionCompiler::inline_instructions(program).unwrap();
        let twice = InstructionCompiler::inline_instructions(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn inlining_never_grows_and_preserves_order(program in program_strategy()) {
        let before: Vec<String> = program.iter().map(|i| i.result.name.clone()).collect();
        let after = InstructionCompiler::inline_instructions(program).unwrap();
        prop_assert!(after.len() <= before.len());

        // Retained names appear in their original relative order.
        let mut cursor = 0;
        for inst in &after {
            let pos = before[cursor..]
                .iter()
                .position(|n| n == &inst.result.name)
                .expect("retained instruction must come from the input");
            cursor += pos + 1;
        }
    }

    #[test]
    fn inlining_leaves_no_dangling_references(program in program_strategy()) {
        let after = InstructionCompiler::inline_instructions(program).unwrap();
        let declared: Vec<&str> = after.iter().map(|i| i.result.name.as_str()).collect();

        fn check(expr: &Expr, declared: &[&str]) -> bool {
            match expr {
                Expr::Constant(_) | Expr::Operator(_) => true,
                Expr::Variable(name) => declared.contains(&name.as_str()),
                Expr::Binary { left, right, .. } => {
                    check(left, declared) && check(right, declared)
                }
                Expr::Call { args, .. } => args.iter().all(|a| check(a, declared)),
                Expr::Sequence(parts) => parts.iter().all(|p| check(p, declared)),
                Expr::Inlineable(inner) => check(inner, declared),
            }
        }

        for (i, inst) in after.iter().enumerate() {
            prop_assert!(check(&inst.expr, &declared[..i]));
        }
    }

    #[test]
    fn inlining_preserves_computed_values(program in program_strategy()) {
        let before_env = run(&program);
        let after = InstructionCompiler::inline_instructions(program).unwrap();
        let after_env = run(&after);

        // Every variable that survived computes the same value as before.
        for (name, value) in &after_env {
            prop_assert_eq!(before_env[name], *value);
        }
        // The final result always survives constant-definition dropping
        // unless it is itself a bare constant.
        if let Some(last) = after.last() {
            prop_assert_eq!(before_env[&last.result.name], after_env[&last.result.name]);
        }
    }
}
