/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::common::LIVE_CLUSTER;
use integration::scenarios::deprecated_tenant_alias;
use serial_test::parallel;

#[tokio::test]
#[parallel]
#[ignore = "needs a running Pulsar cluster, set PULSAR_BROKERS"]
async fn should_accept_deprecated_properties_alias() {
    deprecated_tenant_alias(&LIVE_CLUSTER).await.unwrap();
}
