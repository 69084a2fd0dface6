//! ISA 模块测试

use proptest::prelude::*;

use super::cdc6504::{ACC, CDC6504, X, Y};
use super::cdc8512::CDC8512;
use super::*;

fn encode(isa: &dyn Isa, line: &str) -> Result<Encoding, AsmErrorKind> {
    let labels = LabelTable::new();
    encode_at(isa, line, 0, &labels)
}

fn encode_at(
    isa: &dyn Isa,
    line: &str,
    address: u8,
    labels: &LabelTable,
) -> Result<Encoding, AsmErrorKind> {
    let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
    let operands: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    isa.encode(mnemonic, &operands, &EncodeCtx { address, labels })
}

// ========== CDC8512 ==========

#[test]
fn test_decode_8512_set() {
    let decoded = CDC8512.decode(0x80, 1);
    assert_eq!(decoded.name, "SET");
    assert_eq!(decoded.size, 2);
    assert_eq!(decoded.op, Op::Load { dst: 0, src: Source::Imm(1) });
}

#[test]
fn test_decode_8512_mov() {
    // MOV X2, X0
    let decoded = CDC8512.decode(0xF4, 0);
    assert_eq!(decoded.op, Op::Transfer { dst: 6, src: 4 });
    assert_eq!(CDC8512.format_op(&decoded), "MOV X2, X0");
}

#[test]
fn test_decode_8512_register_add() {
    // ADD X1, X3 = 0110 01 11
    let decoded = CDC8512.decode(0x67, 0);
    assert_eq!(decoded.size, 1);
    assert_eq!(decoded.op, Op::Add { dst: 5, src: Source::Reg(7) });
    assert_eq!(CDC8512.disassemble(0x67, 0), "ADD X1, X3");
}

#[test]
fn test_decode_8512_jump_ignores_bit2() {
    assert_eq!(CDC8512.decode(0xA1, 9).name, "JL");
    assert_eq!(CDC8512.decode(0xA5, 9).name, "JL");
    assert_eq!(
        CDC8512.decode(0xA3, 9).op,
        Op::Jump { cond: Condition::Always, target: 9 }
    );
}

#[test]
fn test_decode_8512_data_marker_is_nop() {
    let decoded = CDC8512.decode(0x0F, 0);
    assert_eq!(decoded.op, Op::Nop);
    assert_eq!(decoded.name, "DATA");
}

#[test]
fn test_decode_8512_unknown() {
    for raw in [0x01, 0x0E, 0x3F, 0xB0] {
        let decoded = CDC8512.decode(raw, 0);
        assert!(decoded.op.is_unknown(), "0x{raw:02X} 不应匹配任何规则");
        assert_eq!(CDC8512.format_op(&decoded), format!("Unknown (0x{raw:02X})"));
    }
}

#[test]
fn test_encode_8512() {
    assert_eq!(encode(&CDC8512, "SET A0, 1").unwrap().as_bytes(), &[0x80, 0x01]);
    assert_eq!(encode(&CDC8512, "ADD X0, 5").unwrap().as_bytes(), &[0x94, 0x05]);
    assert_eq!(encode(&CDC8512, "MOV X2, X0").unwrap().as_bytes(), &[0xF4]);
    assert_eq!(encode(&CDC8512, "CMPZ x1").unwrap().as_bytes(), &[0x4D]);
    assert_eq!(encode(&CDC8512, "SET X2, 'H'").unwrap().as_bytes(), &[0x86, 72]);
    assert_eq!(encode(&CDC8512, "JP 4").unwrap().as_bytes(), &[0xA3, 4]);
    assert_eq!(encode(&CDC8512, "HALT").unwrap().as_bytes(), &[0x00]);
}

#[test]
fn test_encode_8512_bad_operands() {
    assert!(matches!(encode(&CDC8512, "SET A4, 1"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC8512, "SET A0, 300"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC8512, "SET A0"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC8512, "HALT X0"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC8512, "JE 40"), Err(AsmErrorKind::InvalidOperand(_))));
    assert_eq!(
        encode(&CDC8512, "JE nowhere"),
        Err(AsmErrorKind::UndefinedLabel("nowhere".into()))
    );
}

// ========== CDC6504 ==========

#[test]
fn test_decode_6504() {
    assert_eq!(CDC6504.decode(0xA9, 72).op, Op::Load { dst: ACC, src: Source::Imm(72) });
    assert_eq!(
        CDC6504.decode(0x95, 0x10).op,
        Op::Store { src: ACC, addr: 0x10, index: Some(X) }
    );
    assert_eq!(
        CDC6504.decode(0xD0, 0xFC).op,
        Op::Branch { cond: Condition::NotZero, offset: -4 }
    );
    assert_eq!(CDC6504.decode(0x98, 0).op, Op::Transfer { dst: ACC, src: Y });
    assert!(CDC6504.decode(0xFF, 0).op.is_unknown());
}

#[test]
fn test_disassemble_6504() {
    assert_eq!(CDC6504.disassemble(0xA9, 72), "LDA #72");
    assert_eq!(CDC6504.disassemble(0xB9, 0x10), "LDA $10,Y");
    assert_eq!(CDC6504.disassemble(0x85, 0x00), "STA $00");
    assert_eq!(CDC6504.disassemble(0xF0, 0x03), "BEQ +3");
    assert_eq!(CDC6504.disassemble(0xE8, 0), "INX");
}

#[test]
fn test_encode_6504_addressing_modes() {
    let bytes = |line| encode(&CDC6504, line).unwrap().as_bytes().to_vec();
    assert_eq!(bytes("LDA #72"), vec![0xA9, 72]);
    assert_eq!(bytes("LDA 72"), vec![0xA9, 72]);
    assert_eq!(bytes("LDA ACC, 72"), vec![0xA9, 72]);
    assert_eq!(bytes("LDA $10"), vec![0xA5, 0x10]);
    assert_eq!(bytes("LDA $10, X"), vec![0xB5, 0x10]);
    assert_eq!(bytes("LDA $0x10, y"), vec![0xB9, 0x10]);
    assert_eq!(bytes("STA $00"), vec![0x85, 0x00]);
    assert_eq!(bytes("STA A, $00"), vec![0x85, 0x00]);
    assert_eq!(bytes("STA 5"), vec![0x85, 5]);
    assert_eq!(bytes("STA 10, X"), vec![0x95, 10]);
    assert_eq!(bytes("LDA 0x20, Y"), vec![0xB9, 0x20]);
    assert_eq!(bytes("STX $1F"), vec![0x86, 0x1F]);
    assert_eq!(bytes("CPX #'a'"), vec![0xE0, 97]);
    assert_eq!(bytes("SBC $02"), vec![0xE5, 0x02]);
    assert_eq!(bytes("BRK"), vec![0x00]);
}

#[test]
fn test_encode_6504_rejects_mismatched_forms() {
    assert!(matches!(encode(&CDC6504, "STA #5"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC6504, "LDX $10, Y"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC6504, "LDA X, 5"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC6504, "LDA $10, ACC"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC6504, "LDA $100"), Err(AsmErrorKind::InvalidOperand(_))));
    assert!(matches!(encode(&CDC6504, "INX 1"), Err(AsmErrorKind::InvalidOperand(_))));
}

#[test]
fn test_immediates_resolve_labels() {
    let mut labels = LabelTable::new();
    labels.insert("here".into(), 1);
    labels.insert("table".into(), 0x30);

    let set = encode_at(&CDC8512, "SET X0, here", 1, &labels).unwrap();
    assert_eq!(set.as_bytes(), &[0x84, 1]);
    assert_eq!(
        encode(&CDC8512, "SET X0, foo"),
        Err(AsmErrorKind::UndefinedLabel("foo".into()))
    );

    let lda = encode_at(&CDC6504, "LDA #table", 0, &labels).unwrap();
    assert_eq!(lda.as_bytes(), &[0xA9, 0x30]);
    let sta = encode_at(&CDC6504, "STA table, X", 0, &labels).unwrap();
    assert_eq!(sta.as_bytes(), &[0x95, 0x30]);
    assert_eq!(
        encode(&CDC6504, "LDA #missing"),
        Err(AsmErrorKind::UndefinedLabel("missing".into()))
    );
}

#[test]
fn test_encode_6504_branch_is_relative() {
    let mut labels = LabelTable::new();
    labels.insert("loop".into(), 2);
    labels.insert("done".into(), 20);
    let back = encode_at(&CDC6504, "BNE loop", 10, &labels).unwrap();
    // 2 - (10 + 2) = -10
    assert_eq!(back.as_bytes(), &[0xD0, (-10i8) as u8]);
    let fwd = encode_at(&CDC6504, "BCS done", 10, &labels).unwrap();
    assert_eq!(fwd.as_bytes(), &[0xB0, 8]);
    let jmp = encode_at(&CDC6504, "JMP done", 10, &labels).unwrap();
    assert_eq!(jmp.as_bytes(), &[0x4C, 20]);
}

#[test]
fn test_register_aliases() {
    assert_eq!(CDC6504.layout().index_of("a"), Some(ACC));
    assert_eq!(CDC6504.layout().index_of("Acc"), Some(ACC));
    assert_eq!(CDC8512.layout().index_of("x3"), Some(7));
    assert_eq!(CDC8512.layout().index_of("Q0"), None);
}

// ========== 表结构 ==========

#[test]
fn test_tables_have_no_shadowed_rules() {
    for kind in IsaKind::ALL {
        let table = kind.definition().decode_table();
        assert!(table.shadowed().is_empty(), "{}: {:?}", kind, table.shadowed());
        assert!(table.is_priority_ordered(), "{kind} 解码表应按具体程度排序");
    }
}

#[test]
fn test_every_mnemonic_is_decodable() {
    for kind in IsaKind::ALL {
        let isa = kind.definition();
        for m in isa.mnemonics() {
            let def = isa
                .decode_table()
                .defs()
                .iter()
                .find(|d| d.name == m.name && d.size == m.size);
            assert!(def.is_some(), "{kind}: {} 没有同长度的解码规则", m.name);
        }
    }
}

/// 助记符长度与编码长度一致
#[test]
fn test_encoded_size_matches_size_of() {
    let samples_8512 = [
        "HALT", "ZERO A1", "CMPZ X0", "INC A2", "DEC X3", "MOV A0, X1", "SET X0, 9", "CMP X1, 'a'",
        "ADD A3, 0x10", "SUB X2, 32", "JE 1", "JL 2", "JG 3", "JP 0",
    ];
    let samples_6504 = [
        "BRK", "TAX", "TAY", "TXA", "TYA", "INX", "INY", "DEX", "DEY", "CLX", "CLY", "LDA #1",
        "LDX $02", "LDY 3", "STA $04, X", "STX $05", "STY $06", "CMP #7", "CPX $08", "CPY #9",
        "ADC #10", "SBC $0B", "BEQ 2", "BNE 2", "BMI 2", "BPL 2", "BCC 2", "BCS 2", "JMP 12",
    ];
    for (isa, samples) in [(&CDC8512 as &dyn Isa, &samples_8512[..]), (&CDC6504 as &dyn Isa, &samples_6504[..])] {
        assert_eq!(samples.len(), isa.mnemonics().len(), "每个助记符都应有样例");
        for line in samples {
            let mnemonic = line.split(' ').next().unwrap();
            let encoded = encode(isa, line).unwrap_or_else(|e| panic!("{line}: {e}"));
            assert_eq!(Some(encoded.len()), isa.size_of(mnemonic), "{line}");
            // 再解码应回到同一助记符
            let bytes = encoded.as_bytes();
            let decoded = isa.decode(bytes[0], bytes.get(1).copied().unwrap_or(0));
            assert_eq!(decoded.name, mnemonic, "{line}");
        }
    }
}

proptest! {
    #[test]
    fn decode_is_total(raw in any::<u8>(), next in any::<u8>()) {
        for kind in IsaKind::ALL {
            let decoded = kind.definition().decode(raw, next);
            prop_assert!(decoded.size == 1 || decoded.size == 2);
            prop_assert_eq!(decoded.raw, raw);
            prop_assert!(!kind.definition().format_op(&decoded).is_empty());
        }
    }
}
