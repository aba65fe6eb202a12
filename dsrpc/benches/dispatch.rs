//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Benchmarks for overload resolution and capability matching.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dsrpc::capability::CapabilitySet;
use dsrpc::endpoint::EndpointDescription;
use dsrpc::filter::Filter;
use dsrpc::server::dispatch;
use dsrpc::service::{InterfaceDescriptor, MethodDescriptor};
use dsrpc::transport::Address;
use dsrpc::value::{Primitive, ValueType};

fn overloads() -> InterfaceDescriptor {
    let boxed = ValueType::Boxed(Primitive::I32);
    [
        ValueType::I32,
        ValueType::array(ValueType::I32),
        boxed.clone(),
        ValueType::array(boxed.clone()),
        ValueType::array(ValueType::array(ValueType::I32)),
        ValueType::array(ValueType::array(boxed)),
    ]
    .into_iter()
    .fold(InterfaceDescriptor::new("com.acme.Overloads"), |interface, param| {
        interface.with_method(MethodDescriptor::new("f", vec![param], ValueType::String))
    })
}

fn bench_resolve(c: &mut Criterion) {
    let interface = overloads();
    let mut group = c.benchmark_group("resolve");
    for (label, args) in [
        ("exact", vec![ValueType::I32]),
        ("widening", vec![ValueType::I8]),
        ("nested", vec![ValueType::array(ValueType::array(ValueType::I32))]),
        ("missing", vec![ValueType::String]),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &args, |b, args| {
            b.iter(|| dispatch::resolve(black_box(&interface), "f", black_box(args)).is_ok())
        });
    }
    group.finish();
}

fn endpoints(count: usize) -> CapabilitySet<EndpointDescription> {
    let address: Address = "tcp://127.0.0.1:4100".parse().unwrap();
    let set = CapabilitySet::default();
    for i in 0..count {
        set.add_capability(
            EndpointDescription::builder(format!("endpoint-{i:05}"))
                .interface(format!("com.acme.Service{}", i % 50))
                .process_uuid("remote")
                .address(&address)
                .property("region", if i % 2 == 0 { "east" } else { "west" })
                .build()
                .unwrap(),
        );
    }
    set
}

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("capability_matching");
    for count in [100, 1_000, 10_000] {
        let set = endpoints(count);
        let indexed = Filter::parse("(&(service.interfaces=com.acme.Service7)(region=west))").unwrap();
        let scanned = Filter::parse("(&(service.interfaces=*Service7)(region=west))").unwrap();
        group.bench_with_input(BenchmarkId::new("indexed", count), &indexed, |b, filter| {
            b.iter(|| set.matches(black_box(filter)).len())
        });
        group.bench_with_input(BenchmarkId::new("scanned", count), &scanned, |b, filter| {
            b.iter(|| set.matches(black_box(filter)).len())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_matching);
criterion_main!(benches);
