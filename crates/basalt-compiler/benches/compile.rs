//! Compilation pipeline benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use basalt_compiler::{compile, tokenize};

const SAMPLE_SOURCE: &str = r#"Const LIMIT = 100

Function Classify(n As Integer) As String
    If n > 90 Then
        Classify = "high"
    ElseIf n > 50 Then
        Classify = "mid"
    ElseIf n > 10 Then
        Classify = "low"
    Else
        Classify = "tiny"
    End If
End Function

Sub Report(label As String, Optional count As Integer = 1)
    Dim line As String
    line = label & ": " & count
    MsgBox line
End Sub

Sub Main()
    Dim i As Integer
    Dim total As Integer
    total = 0
    For i = 1 To LIMIT
        Select Case Classify(i)
            Case "high", "mid"
                total = total + 2
            Case "low"
                total = total + 1
            Case Else
                total = total
        End Select
    Next i
    Do While total > 10
        total = total \ 2
    Loop
    Call Report("total", count:=total)
End Sub
"#;

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("tokenize", |b| {
        b.iter(|| tokenize(black_box(SAMPLE_SOURCE)));
    });

    group.bench_function("full", |b| {
        b.iter(|| compile(black_box(SAMPLE_SOURCE)));
    });

    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
